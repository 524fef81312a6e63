use serde_json::{json, Value};

use crate::{monitoring::prometheus, release::ReleaseRequest};

/// Chart repository of the dashboard.
pub const GRAFANA_REPO: &str = "grafana";
/// Dashboard chart name.
pub const GRAFANA_CHART: &str = "grafana";
/// Release name of the dashboard.
pub const GRAFANA_RELEASE_NAME: &str = "grafana";

/// Settings for the dashboard release.
#[derive(Clone, Debug, PartialEq)]
pub struct GrafanaConfig {
    /// Password of the `admin` user.
    pub admin_password: String,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            admin_password: "admin123".to_owned(),
        }
    }
}

fn values(config: &GrafanaConfig) -> Value {
    json!({
        "adminPassword": config.admin_password,
        "resources": {
            "limits": {
                "cpu": "512m",
                "memory": "512Mi",
            },
            "requests": {
                "cpu": "256m",
                "memory": "256Mi",
            },
        },
        "datasources": {
            "datasources.yaml": {
                "apiVersion": 1,
                "datasources": [
                    {
                        "name": "Prometheus",
                        // Both releases share a namespace so the short name resolves.
                        "url": prometheus::server_url(),
                        "type": "prometheus",
                        "isDefault": true,
                    },
                ],
            },
        },
    })
}

/// Release request installing the dashboard into `ns`, wired to the collector.
pub fn release_request(ns: &str, config: &GrafanaConfig) -> ReleaseRequest {
    ReleaseRequest::new(
        GRAFANA_REPO,
        GRAFANA_CHART,
        GRAFANA_RELEASE_NAME,
        ns,
        values(config),
    )
}
