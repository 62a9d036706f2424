//! Northbound service requests.

use otn_types::{Channel, PathHop, ServicePath};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a fresh correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Request to create a service along an explicit route.
///
/// The route is the A-Z direction; the Z-A direction is its reverse.
///
/// ```yaml
/// service_name: service1
/// channel: "1"
/// route:
///   - { node_id: ROADM-A1, src_tp: SRG1-PP1-TXRX, dest_tp: DEG1-TTP-TXRX }
///   - { node_id: ROADM-C1, src_tp: DEG1-TTP-TXRX, dest_tp: SRG1-PP1-TXRX }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCreateRequest {
    pub service_name: String,
    #[serde(default = "new_correlation_id")]
    pub correlation_id: String,
    pub channel: Channel,
    pub route: Vec<PathHop>,
    #[serde(default)]
    pub is_temporary: bool,
}

impl ServiceCreateRequest {
    pub fn new(service_name: impl Into<String>, channel: Channel, route: Vec<PathHop>) -> Self {
        Self {
            service_name: service_name.into(),
            correlation_id: new_correlation_id(),
            channel,
            route,
            is_temporary: false,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn temporary(mut self) -> Self {
        self.is_temporary = true;
        self
    }

    /// The A-Z path described by the route.
    pub fn path(&self) -> ServicePath {
        ServicePath::new(self.service_name.clone(), self.channel, self.route.clone())
    }
}

/// Reads a YAML list of create requests.
pub fn parse_requests(content: &str) -> Result<Vec<ServiceCreateRequest>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}
