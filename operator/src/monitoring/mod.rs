//! Monitoring stack installed as chart releases: a prometheus collector and a grafana dashboard.
/// Grafana dashboard release.
pub mod grafana;
/// Prometheus collector release.
pub mod prometheus;

use tracing::info;

use crate::{
    error::Error,
    namespace::ensure_namespace,
    release::{install, PackageManager, Release},
    utils::Context,
};

pub use grafana::GrafanaConfig;
pub use prometheus::PrometheusConfig;

/// Configuration of the `init` workflow.
#[derive(Clone, Debug, PartialEq)]
pub struct InitConfig {
    /// Namespace receiving both releases.
    pub namespace: String,
    /// Create the namespace before installing.
    pub create_namespace: bool,
    /// Collector settings.
    pub prometheus: PrometheusConfig,
    /// Dashboard settings.
    pub grafana: GrafanaConfig,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            namespace: "monitoring".to_owned(),
            create_namespace: false,
            prometheus: PrometheusConfig::default(),
            grafana: GrafanaConfig::default(),
        }
    }
}

/// Install the collector and then the dashboard into the configured namespace.
///
/// The releases are installed one after the other. When the dashboard fails
/// the collector release is left in place.
#[tracing::instrument(skip_all, fields(namespace = %config.namespace))]
pub async fn init(
    cx: &Context<impl PackageManager>,
    config: &InitConfig,
) -> Result<Vec<Release>, Error> {
    let ns = &config.namespace;
    ensure_namespace(cx, ns, config.create_namespace).await?;

    let mut releases = Vec::with_capacity(2);
    for request in [
        prometheus::release_request(ns, &config.prometheus),
        grafana::release_request(ns, &config.grafana),
    ] {
        let release = install(&cx.package_manager, request).await?;
        info!(
            "Installed {} release to namespace {}",
            release.name, release.namespace
        );
        releases.push(release);
    }
    Ok(releases)
}
