use serde_json::{json, Value};

use crate::release::ReleaseRequest;

/// Chart repository of the collector.
pub const PROM_REPO: &str = "prometheus-community";
/// Collector chart name.
pub const PROM_CHART: &str = "prometheus";
/// Release name of the collector.
pub const PROM_RELEASE_NAME: &str = "prometheus";

/// Settings for the metrics collector release.
#[derive(Clone, Debug, PartialEq)]
pub struct PrometheusConfig {
    /// How often targets are scraped, e.g. `10s`.
    pub scrape_interval: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            scrape_interval: "10s".to_owned(),
        }
    }
}

/// Address of the server Service the chart creates for the release.
pub fn server_url() -> String {
    format!("http://{PROM_RELEASE_NAME}-server")
}

// Alertmanager and the node exporter are never deployed.
fn values(config: &PrometheusConfig) -> Value {
    json!({
        "alertmanager": {
            "enabled": false,
        },
        "server": {
            "global": {
                "scrape_interval": config.scrape_interval,
            },
        },
        "prometheus-node-exporter": {
            "enabled": false,
        },
    })
}

/// Release request installing the collector into `ns`.
pub fn release_request(ns: &str, config: &PrometheusConfig) -> ReleaseRequest {
    ReleaseRequest::new(PROM_REPO, PROM_CHART, PROM_RELEASE_NAME, ns, values(config))
}
