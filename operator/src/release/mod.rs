//! Chart releases installed through a package manager.
pub mod helm;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Failures while turning a [`ReleaseRequest`] into a [`Release`].
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// The chart is not present in the configured repository index.
    #[error("chart {chart} could not be located: {message}")]
    ChartResolution {
        /// Chart reference in `repo/chart` form.
        chart: String,
        /// Package manager diagnostics.
        message: String,
    },
    /// The located chart artifact could not be parsed.
    #[error("chart at {} could not be loaded: {message}", .path.display())]
    ChartLoad {
        /// Location of the chart artifact.
        path: PathBuf,
        /// Parser diagnostics.
        message: String,
    },
    /// Rendering or installing the release was rejected.
    #[error("release {release} could not be installed into namespace {namespace}: {message}")]
    Install {
        /// Name of the rejected release.
        release: String,
        /// Namespace of the rejected release.
        namespace: String,
        /// Package manager diagnostics.
        message: String,
    },
}

impl ReleaseError {
    /// True when the chart itself could not be used, as opposed to an install rejection.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ReleaseError::ChartResolution { .. } | ReleaseError::ChartLoad { .. }
        )
    }
}

/// Request to install a chart under a release name.
///
/// The request is immutable and consumed by [`install`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    repo_name: String,
    chart_name: String,
    release_name: String,
    namespace: String,
    values: serde_json::Value,
}

impl ReleaseRequest {
    /// Create a request. `values` overrides the chart defaults.
    pub fn new(
        repo_name: impl Into<String>,
        chart_name: impl Into<String>,
        release_name: impl Into<String>,
        namespace: impl Into<String>,
        values: serde_json::Value,
    ) -> Self {
        Self {
            repo_name: repo_name.into(),
            chart_name: chart_name.into(),
            release_name: release_name.into(),
            namespace: namespace.into(),
            values,
        }
    }
    /// Name of the chart repository.
    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }
    /// Name of the chart within the repository.
    pub fn chart_name(&self) -> &str {
        &self.chart_name
    }
    /// Name of the release to create.
    pub fn release_name(&self) -> &str {
        &self.release_name
    }
    /// Namespace to install into.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    /// Value overlay for the chart.
    pub fn values(&self) -> &serde_json::Value {
        &self.values
    }
    /// Chart reference in `repo/chart` form.
    pub fn chart_ref(&self) -> String {
        format!("{}/{}", self.repo_name, self.chart_name)
    }
}

/// Metadata read from a chart's `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart name.
    pub name: String,
    /// Chart version.
    pub version: String,
    /// Version of the packaged application.
    #[serde(default)]
    pub app_version: Option<String>,
}

/// A chart that was located and loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Local directory of the unpacked chart.
    pub path: PathBuf,
    /// Parsed chart metadata.
    pub metadata: ChartMetadata,
}

/// An installed release as reported by the package manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Release name.
    pub name: String,
    /// Namespace holding the release.
    pub namespace: String,
    /// Revision of the release, 1 for a fresh install.
    pub revision: u32,
    /// Status reported by the package manager, e.g. `deployed`.
    pub status: String,
}

/// Define the behavior we consume from a package manager.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageManager {
    /// Find `chart` in the repository `repo` and make it available locally.
    async fn locate_chart(&self, repo: &str, chart: &str) -> Result<PathBuf, ReleaseError>;
    /// Parse the chart found at `path`.
    async fn load_chart(&self, path: &Path) -> Result<Chart, ReleaseError>;
    /// Install the chart as described by the request.
    async fn install_chart(
        &self,
        chart: &Chart,
        request: &ReleaseRequest,
    ) -> Result<Release, ReleaseError>;
}

/// Locate, load and install the chart described by `request`.
///
/// Each step is attempted once and the first failure is returned. An existing
/// release with the same name is never replaced or removed.
#[tracing::instrument(skip_all, fields(release = request.release_name(), namespace = request.namespace()))]
pub async fn install(
    package_manager: &impl PackageManager,
    request: ReleaseRequest,
) -> Result<Release, ReleaseError> {
    let path = package_manager
        .locate_chart(request.repo_name(), request.chart_name())
        .await?;
    debug!(chart = %request.chart_ref(), ?path, "located chart");

    let chart = package_manager.load_chart(&path).await?;
    debug!(chart = %chart.metadata.name, version = %chart.metadata.version, "loaded chart");

    let release = package_manager.install_chart(&chart, &request).await?;
    info!(
        release = %release.name,
        namespace = %release.namespace,
        revision = release.revision,
        status = %release.status,
        "installed release"
    );
    Ok(release)
}
