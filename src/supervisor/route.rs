//! Address construction for the supervisor's namespaced resources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The resource namespace a route belongs to. Each namespace maps to a fixed
/// path prefix under the supervisor's base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteType {
    /// Robot connections: actions and raw observations.
    Connection,
    /// Declarative configuration (actions, observations, task, robot).
    Config,
    /// Simulator flags and control.
    Simulator,
    /// Task status flags.
    Status,
    /// Used verbatim, no prefix.
    Explicit,
}

impl RouteType {
    /// Path prefix for this namespace.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Connection => "connections/",
            Self::Config => "config/",
            Self::Simulator => "simulator/",
            Self::Status => "status/",
            Self::Explicit => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "CONNECTION",
            Self::Config => "CONFIG",
            Self::Simulator => "SIMULATOR",
            Self::Status => "STATUS",
            Self::Explicit => "EXPLICIT",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the fully-qualified address of `route_name` in namespace `route`.
///
/// A trailing slash is ensured on `base` before the namespace prefix is
/// appended.
pub fn build_address(base: &str, route_name: &str, route: RouteType) -> String {
    let mut address = String::with_capacity(base.len() + route_name.len() + 16);
    address.push_str(base);
    if !base.ends_with('/') {
        address.push('/');
    }
    address.push_str(route.prefix());
    address.push_str(route_name);
    address
}
