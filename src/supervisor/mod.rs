//! Everything needed to talk to a BenchBot supervisor.
//!
//! - [`route`] -- namespaced address construction.
//! - [`transport`] -- the [`Transport`] seam and its HTTP implementation.
//! - [`client`] -- [`Supervisor`], typed reads, sends and commands.
//! - [`connection`] -- the startup handshake.
//! - [`mock`] -- an in-process [`MockSupervisor`] that replays scripted
//!   behaviour, so sessions can run without a live deployment.

pub mod client;
pub mod connection;
pub mod mock;
pub mod route;
pub mod transport;

pub use client::Supervisor;
pub use mock::MockSupervisor;
pub use route::{build_address, RouteType};
pub use transport::{HttpTransport, Transport};

// ---------------------------------------------------------------------------
// AnyTransport: enum dispatch over the concrete transports
// ---------------------------------------------------------------------------

/// Runtime selection between the live and mock transports without `dyn`
/// (async trait methods are not object safe).
#[derive(Debug, Clone)]
pub enum AnyTransport {
    Http(HttpTransport),
    Mock(MockSupervisor),
}

impl Transport for AnyTransport {
    async fn fetch(&self, address: &str) -> crate::error::Result<serde_json::Value> {
        match self {
            Self::Http(t) => t.fetch(address).await,
            Self::Mock(t) => t.fetch(address).await,
        }
    }

    async fn send(&self, address: &str, payload: &serde_json::Value) -> crate::error::Result<()> {
        match self {
            Self::Http(t) => t.send(address, payload).await,
            Self::Mock(t) => t.send(address, payload).await,
        }
    }
}
