//! Namespaced access to the supervisor.

use serde_json::Value;
use tracing::debug;

use super::route::{build_address, RouteType};
use super::transport::Transport;
use crate::error::{BenchBotError, Result};

/// A supervisor reachable at `address` through transport `T`.
#[derive(Debug, Clone)]
pub struct Supervisor<T> {
    address: String,
    transport: T,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(address: impl Into<String>, transport: T) -> Self {
        Self {
            address: address.into(),
            transport,
        }
    }

    /// The configured base address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn resolve(&self, route_name: &str, route: RouteType) -> String {
        build_address(&self.address, route_name, route)
    }

    /// Read `route_name` in namespace `route`.
    pub async fn receive(&self, route_name: &str, route: RouteType) -> Result<Value> {
        let address = self.resolve(route_name, route);
        self.transport.fetch(&address).await
    }

    /// Deliver `payload` to `route_name` in namespace `route`.
    pub async fn send(&self, route_name: &str, payload: &Value, route: RouteType) -> Result<()> {
        let address = self.resolve(route_name, route);
        debug!(route = route_name, namespace = %route, "sending to supervisor");
        self.transport.send(&address, payload).await
    }

    /// Trigger a side effect such as `simulator/restart`.
    ///
    /// The supervisor exposes commands as plain reads, so this goes out as a
    /// fetch and the response body is discarded.
    pub async fn command(&self, route_name: &str, route: RouteType) -> Result<()> {
        let address = self.resolve(route_name, route);
        debug!(route = route_name, namespace = %route, "issuing supervisor command");
        self.transport.fetch(&address).await.map(|_| ())
    }

    /// Read a boolean flag answered as `{<route_name>: bool}`.
    pub async fn flag(&self, route_name: &str, route: RouteType) -> Result<bool> {
        let address = self.resolve(route_name, route);
        let value = self.transport.fetch(&address).await?;
        value
            .get(route_name)
            .and_then(Value::as_bool)
            .ok_or_else(|| {
                BenchBotError::malformed(address, format!("expected boolean field '{route_name}'"))
            })
    }

    /// Read a JSON list of strings.
    pub async fn string_list(&self, route_name: &str, route: RouteType) -> Result<Vec<String>> {
        let address = self.resolve(route_name, route);
        let value = self.transport.fetch(&address).await?;
        serde_json::from_value(value)
            .map_err(|e| BenchBotError::malformed(address, format!("expected a list of strings: {e}")))
    }

    /// Read a JSON string.
    pub async fn string(&self, route_name: &str, route: RouteType) -> Result<String> {
        let address = self.resolve(route_name, route);
        match self.transport.fetch(&address).await? {
            Value::String(s) => Ok(s),
            other => Err(BenchBotError::malformed(
                address,
                format!("expected a string, got {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::mock::{MockSupervisor, RequestKind};

    fn supervisor(mock: &MockSupervisor) -> Supervisor<MockSupervisor> {
        Supervisor::new("http://mock:10000", mock.clone())
    }

    #[tokio::test]
    async fn flag_reads_named_field() {
        let mock = MockSupervisor::new();
        mock.set_collided(true);
        let sup = supervisor(&mock);

        assert!(sup.flag("is_collided", RouteType::Simulator).await.unwrap());
        assert!(!sup.flag("is_finished", RouteType::Status).await.unwrap());
    }

    #[tokio::test]
    async fn flag_with_wrong_shape_is_malformed() {
        let mock = MockSupervisor::new();
        let sup = supervisor(&mock);
        // `config/task_name` answers with a bare string, not a flag object.
        let err = sup.flag("task_name", RouteType::Config).await.unwrap_err();
        assert!(matches!(err, BenchBotError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn command_goes_out_as_fetch() {
        let mock = MockSupervisor::new();
        let sup = supervisor(&mock);
        sup.command("restart", RouteType::Simulator).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].is(RequestKind::Fetch, "/simulator/restart"));
        assert_eq!(mock.restarts(), 1);
    }

    #[tokio::test]
    async fn lists_and_strings_decode() {
        let mock = MockSupervisor::new().with_actions(&["move_next"]);
        let sup = supervisor(&mock);
        assert_eq!(
            sup.string_list("actions", RouteType::Config).await.unwrap(),
            vec!["move_next"]
        );
        assert_eq!(
            sup.string("task_name", RouteType::Config).await.unwrap(),
            "semantic_slam:passive:ground_truth"
        );
        let err = sup.string_list("task_name", RouteType::Config).await.unwrap_err();
        assert!(matches!(err, BenchBotError::MalformedResponse { .. }));
    }
}
