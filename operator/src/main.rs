//! ucac provisions monitoring and performance tests on K8s
#![deny(missing_docs)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use opentelemetry::{global, KeyValue};
use tracing::{error, info};

use ucac_common::peers::PeerTopology;
use ucac_operator::{
    error::Error,
    monitoring::{self, GrafanaConfig, InitConfig, PrometheusConfig},
    performance::{
        self, HarnessParams, JobImageConfig, PerformanceConfig, TestDuration, TestsStrategy,
    },
    release::helm::{Helm, HelmSettings},
    utils::{kube_client, Context},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Export traces and metrics to this OTLP endpoint.
    #[arg(long, env = "UCAC_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(flatten)]
    helm: HelmOpts,
}

/// Settings of the helm binary used to install releases.
#[derive(Args, Debug)]
struct HelmOpts {
    /// Path to the helm binary.
    #[arg(long, env = "UCAC_HELM_BIN", default_value = "helm", global = true)]
    helm_bin: PathBuf,

    /// Kubeconfig context used for the cluster and helm instead of the current one.
    #[arg(long, env = "UCAC_KUBE_CONTEXT", global = true)]
    kube_context: Option<String>,

    /// Directory charts are pulled into.
    #[arg(long, env = "UCAC_CHART_CACHE", global = true)]
    chart_cache: Option<PathBuf>,
}

impl From<HelmOpts> for HelmSettings {
    fn from(value: HelmOpts) -> Self {
        let defaults = HelmSettings::default();
        Self {
            binary: value.helm_bin,
            kube_context: value.kube_context,
            cache_dir: value.chart_cache.unwrap_or(defaults.cache_dir),
        }
    }
}

/// Available Subcommands
#[derive(Subcommand, Debug)]
enum Command {
    /// Install the prometheus and grafana releases
    Init(InitOpts),
    /// Deploy the performance test harness
    Performance(PerformanceOpts),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Init(_) => "init",
            Command::Performance(_) => "performance",
        }
    }
}

/// Options to the init command
#[derive(Args, Debug)]
struct InitOpts {
    /// Namespace receiving both releases.
    #[arg(short, long, env = "UCAC_NAMESPACE", default_value = "monitoring")]
    namespace: String,

    /// Create the namespace before installing.
    #[arg(long, env = "UCAC_CREATE_NAMESPACE")]
    create_namespace: bool,

    /// How often prometheus scrapes its targets.
    #[arg(long, env = "UCAC_SCRAPE_INTERVAL", default_value = "10s")]
    scrape_interval: String,

    /// Password of the grafana admin user.
    #[arg(
        long,
        env = "UCAC_GRAFANA_ADMIN_PASSWORD",
        default_value = "admin123",
        hide_env_values = true
    )]
    grafana_admin_password: String,
}

impl From<InitOpts> for InitConfig {
    fn from(value: InitOpts) -> Self {
        Self {
            namespace: value.namespace,
            create_namespace: value.create_namespace,
            prometheus: PrometheusConfig {
                scrape_interval: value.scrape_interval,
            },
            grafana: GrafanaConfig {
                admin_password: value.grafana_admin_password,
            },
        }
    }
}

/// Options to the performance command
#[derive(Args, Debug)]
struct PerformanceOpts {
    /// Namespace receiving the harness objects.
    #[arg(short, long, env = "UCAC_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Create the namespace before deploying.
    #[arg(long, env = "UCAC_CREATE_NAMESPACE")]
    create_namespace: bool,

    /// Number of peers in each peerset, e.g. 1,2.
    #[arg(long, env = "UCAC_PEERS", value_delimiter = ',')]
    peers: Vec<u32>,

    /// Image of the performance test harness.
    #[arg(
        long,
        env = "UCAC_IMAGE",
        default_value = "ghcr.io/davenury/performance:latest"
    )]
    image: String,

    /// Pull policy of the harness image.
    #[arg(long, env = "UCAC_IMAGE_PULL_POLICY")]
    image_pull_policy: Option<String>,

    /// Number of changes sent to a single peerset.
    #[arg(long, env = "UCAC_SINGLE_REQUESTS_NUMBER", default_value_t = 1)]
    single_requests_number: u32,

    /// Number of changes spanning multiple peersets.
    #[arg(long, env = "UCAC_MULTIPLE_REQUESTS_NUMBER", default_value_t = 0)]
    multiple_requests_number: u32,

    /// ISO-8601 duration of the test, e.g. PT1S or PT5M.
    #[arg(short = 'd', long, env = "UCAC_TEST_DURATION", default_value = "PT1S")]
    test_duration: TestDuration,

    /// Maximum number of peersets taking part in one change.
    #[arg(long, env = "UCAC_MAX_PEERSETS_IN_CHANGE", default_value_t = 2)]
    max_peersets_in_change: u32,

    /// Strategy of the test: random or delay_on_conflicts.
    #[arg(
        long,
        env = "UCAC_TESTS_STRATEGY",
        default_value = "delay_on_conflicts"
    )]
    tests_strategy: TestsStrategy,
}

impl From<PerformanceOpts> for PerformanceConfig {
    fn from(value: PerformanceOpts) -> Self {
        Self {
            namespace: value.namespace,
            create_namespace: value.create_namespace,
            image: JobImageConfig {
                image: value.image,
                image_pull_policy: value.image_pull_policy,
            },
            harness: HarnessParams {
                peers: PeerTopology::from_counts(&value.peers),
                single_requests: value.single_requests_number,
                multiple_requests: value.multiple_requests_number,
                test_duration: value.test_duration,
                max_peersets_in_change: value.max_peersets_in_change,
                strategy: value.tests_strategy,
            },
        }
    }
}

async fn run(command: Command, settings: HelmSettings) -> Result<(), Error> {
    // The cluster client and helm must target the same context
    let k_client = kube_client(settings.kube_context.as_deref()).await?;
    let cx = Context::new(k_client, Helm::new(settings));
    match command {
        Command::Init(opts) => {
            let config: InitConfig = opts.into();
            let releases = monitoring::init(&cx, &config).await?;
            for release in releases {
                info!(
                    release = %release.name,
                    namespace = %release.namespace,
                    revision = release.revision,
                    status = %release.status,
                    "release installed"
                );
            }
        }
        Command::Performance(opts) => {
            let config: PerformanceConfig = opts.into();
            let outcome = performance::performance(&cx, &config).await?;
            info!(namespace = %config.namespace, ?outcome, "performance test deployed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let telemetry = ucac_common::telemetry::init(args.otlp_endpoint.clone()).await?;

    let meter = global::meter("ucac");
    let runs = meter
        .u64_counter("ucac_runs")
        .with_description("Number of runs of the ucac cli")
        .init();

    let command_name = args.command.name();
    info!(command = command_name, ?args.otlp_endpoint, "starting ucac");
    let result = run(args.command, args.helm.into()).await;
    let code = match &result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(command = command_name, %err, "command failed");
            ExitCode::from(err.exit_code())
        }
    };
    runs.add(
        1,
        &[
            KeyValue::new("command", command_name),
            KeyValue::new("result", if result.is_ok() { "success" } else { "failure" }),
        ],
    );

    // Flush traces and metrics before shutdown
    telemetry.shutdown()?;
    Ok(code)
}
