//! [`PackageManager`] backed by the helm CLI.
use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use crate::release::{Chart, ChartMetadata, PackageManager, Release, ReleaseError, ReleaseRequest};

/// Settings shared by every helm invocation of a process.
#[derive(Clone, Debug, PartialEq)]
pub struct HelmSettings {
    /// Path to the helm binary.
    pub binary: PathBuf,
    /// Kubeconfig context to use instead of the current one, shared with the cluster client.
    pub kube_context: Option<String>,
    /// Directory charts are pulled into.
    pub cache_dir: PathBuf,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("helm"),
            kube_context: None,
            cache_dir: std::env::temp_dir().join("ucac-charts"),
        }
    }
}

/// Runs helm as a child process.
pub struct Helm {
    settings: HelmSettings,
}

impl Helm {
    /// Create a client. The settings are not modified afterwards.
    pub fn new(settings: HelmSettings) -> Self {
        Self { settings }
    }

    fn global_args(&self) -> Vec<OsString> {
        match &self.settings.kube_context {
            Some(context) => vec!["--kube-context".into(), context.into()],
            None => vec![],
        }
    }

    fn pull_args(&self, chart_ref: &str, dest: &Path) -> Vec<OsString> {
        let mut args = self.global_args();
        args.extend([
            "pull".into(),
            chart_ref.into(),
            "--untar".into(),
            "--untardir".into(),
            dest.into(),
        ]);
        args
    }

    fn install_args(&self, chart: &Chart, request: &ReleaseRequest) -> Vec<OsString> {
        let mut args = self.global_args();
        args.extend([
            "install".into(),
            request.release_name().into(),
            chart.path.as_os_str().to_owned(),
            "--namespace".into(),
            request.namespace().into(),
            // Values are streamed through stdin
            "--values".into(),
            "-".into(),
            "--output".into(),
            "json".into(),
        ]);
        args
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

#[derive(Deserialize)]
struct ReleaseInfo {
    status: String,
}

/// Subset of the release document printed by `helm install --output json`.
#[derive(Deserialize)]
struct HelmRelease {
    name: String,
    namespace: String,
    version: u32,
    info: ReleaseInfo,
}

fn parse_release(stdout: &[u8]) -> Result<Release, serde_json::Error> {
    let release: HelmRelease = serde_json::from_slice(stdout)?;
    Ok(Release {
        name: release.name,
        namespace: release.namespace,
        revision: release.version,
        status: release.info.status,
    })
}

#[async_trait]
impl PackageManager for Helm {
    async fn locate_chart(&self, repo: &str, chart: &str) -> Result<PathBuf, ReleaseError> {
        let chart_ref = format!("{repo}/{chart}");
        let resolution_error = |message: String| ReleaseError::ChartResolution {
            chart: chart_ref.clone(),
            message,
        };

        let dest = self.settings.cache_dir.join(repo);
        let chart_dir = dest.join(chart);
        // helm refuses to untar over an existing directory
        match tokio::fs::remove_dir_all(&chart_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(resolution_error(err.to_string())),
        }
        tokio::fs::create_dir_all(&dest)
            .await
            .map_err(|err| resolution_error(err.to_string()))?;

        debug!(chart = %chart_ref, ?dest, "pulling chart");
        let output = self
            .command(self.pull_args(&chart_ref, &dest))
            .output()
            .await
            .map_err(|err| resolution_error(format!("failed to run helm: {err}")))?;
        if !output.status.success() {
            return Err(resolution_error(stderr(&output)));
        }
        Ok(chart_dir)
    }

    async fn load_chart(&self, path: &Path) -> Result<Chart, ReleaseError> {
        let load_error = |message: String| ReleaseError::ChartLoad {
            path: path.to_owned(),
            message,
        };
        let chart_yaml = tokio::fs::read_to_string(path.join("Chart.yaml"))
            .await
            .map_err(|err| load_error(err.to_string()))?;
        let metadata: ChartMetadata =
            serde_yaml::from_str(&chart_yaml).map_err(|err| load_error(err.to_string()))?;
        Ok(Chart {
            path: path.to_owned(),
            metadata,
        })
    }

    async fn install_chart(
        &self,
        chart: &Chart,
        request: &ReleaseRequest,
    ) -> Result<Release, ReleaseError> {
        let install_error = |message: String| ReleaseError::Install {
            release: request.release_name().to_owned(),
            namespace: request.namespace().to_owned(),
            message,
        };
        let values =
            serde_yaml::to_string(request.values()).map_err(|err| install_error(err.to_string()))?;

        let mut child = self
            .command(self.install_args(chart, request))
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|err| install_error(format!("failed to run helm: {err}")))?;
        // stdin is dropped after the write so helm sees the end of the values
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(values.as_bytes()).await,
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .await
            .map_err(|err| install_error(err.to_string()))?;
        // helm's own diagnostics win over a broken pipe
        if !output.status.success() {
            return Err(install_error(stderr(&output)));
        }
        written.map_err(|err| install_error(err.to_string()))?;
        parse_release(&output.stdout)
            .map_err(|err| install_error(format!("unexpected helm output: {err}")))
    }
}
