//! Performance test harness: a notification Service, a ConfigMap carrying the
//! test parameters and a Job running the load generator.
/// Harness environment built from the test parameters.
pub mod config;
/// Harness Job.
pub mod job;
/// Notification Service.
pub mod service;

use k8s_openapi::api::{batch::v1::JobSpec, core::v1::ServiceSpec};
use tracing::info;

use crate::{
    error::Error,
    labels::{harness_labels, project_labels, unmatched_selector},
    namespace::ensure_namespace,
    utils::{create_config_map, create_job, create_service, Context, CreateOutcome},
};

pub use config::{HarnessConfig, HarnessParams, TestDuration, TestsStrategy};
pub use job::JobImageConfig;

/// Port the harness container and its Service listen on.
pub const HARNESS_PORT: i32 = 8080;
/// Port every peer service of the system under test listens on.
pub const PEER_PORT: u16 = 8080;
/// Name of the Service fronting the harness pod.
pub const NOTIFICATION_SERVICE_NAME: &str = "notification-service";
/// Name of the ConfigMap holding the harness environment.
pub const CONFIG_MAP_NAME: &str = "performance-test-configmap";
/// Name of the harness Job.
pub const JOB_NAME: &str = "performance-test";

/// Address peers use to notify the harness.
pub fn notification_service_address() -> String {
    format!("http://{NOTIFICATION_SERVICE_NAME}:{HARNESS_PORT}")
}

/// Configuration of the `performance` workflow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerformanceConfig {
    /// Namespace receiving the harness objects.
    pub namespace: String,
    /// Create the namespace before deploying.
    pub create_namespace: bool,
    /// Harness container image.
    pub image: JobImageConfig,
    /// Test parameters.
    pub harness: HarnessParams,
}

/// Outcome of each create call of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerformanceOutcome {
    /// Notification Service.
    pub service: CreateOutcome,
    /// Harness ConfigMap.
    pub config_map: CreateOutcome,
    /// Harness Job.
    pub job: CreateOutcome,
}

// The Service must reach the Job pods and the pods must read the ConfigMap.
fn check_harness(service: &ServiceSpec, job: &JobSpec) -> Result<(), Error> {
    let selector = service.selector.clone().unwrap_or_default();
    if selector.is_empty() {
        return Err(Error::InvalidHarness(format!(
            "service {NOTIFICATION_SERVICE_NAME} has no selector"
        )));
    }
    let pod_labels = job
        .template
        .metadata
        .as_ref()
        .and_then(|meta| meta.labels.clone())
        .unwrap_or_default();
    let unmatched = unmatched_selector(&selector, &pod_labels);
    if !unmatched.is_empty() {
        return Err(Error::InvalidHarness(format!(
            "service {NOTIFICATION_SERVICE_NAME} selector {} does not match job {JOB_NAME} pods",
            unmatched.join(",")
        )));
    }

    let containers = job
        .template
        .spec
        .as_ref()
        .map(|pod| pod.containers.as_slice())
        .unwrap_or_default();
    let reads_config_map = containers.iter().any(|container| {
        container.env_from.iter().flatten().any(|source| {
            source
                .config_map_ref
                .as_ref()
                .and_then(|r| r.name.as_deref())
                == Some(CONFIG_MAP_NAME)
        })
    });
    if !reads_config_map {
        return Err(Error::InvalidHarness(format!(
            "job {JOB_NAME} does not read configmap {CONFIG_MAP_NAME}"
        )));
    }
    Ok(())
}

/// Deploy the harness: the notification Service, then the ConfigMap, then the Job.
///
/// Objects that already exist are left untouched and count as success. A
/// failure stops the workflow and leaves earlier objects in place.
#[tracing::instrument(skip_all, fields(namespace = %config.namespace))]
pub async fn performance<P>(
    cx: &Context<P>,
    config: &PerformanceConfig,
) -> Result<PerformanceOutcome, Error> {
    let ns = &config.namespace;
    let service_spec = service::service_spec();
    let job_spec = job::job_spec(&config.image);
    check_harness(&service_spec, &job_spec)?;
    let data = HarnessConfig::build(&config.harness).into_data();

    ensure_namespace(cx, ns, config.create_namespace).await?;

    info!(peers = %config.harness.peers, "deploying performance test");
    let service =
        create_service(cx, ns, NOTIFICATION_SERVICE_NAME, service_spec, project_labels()).await?;
    let config_map = create_config_map(cx, ns, CONFIG_MAP_NAME, data, project_labels()).await?;
    let job = create_job(cx, ns, JOB_NAME, job_spec, harness_labels()).await?;
    Ok(PerformanceOutcome {
        service,
        config_map,
        job,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use ucac_common::peers::PeerTopology;

    use crate::utils::test::{timeout_after_1s, ApiServerVerifier, Request};

    fn scenario_b() -> PerformanceConfig {
        PerformanceConfig {
            namespace: "default".to_owned(),
            harness: HarnessParams {
                peers: PeerTopology::from_counts(&[1, 2]),
                single_requests: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deploys_service_config_map_and_job_in_order() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..3 {
                requests.push(fakeserver.handle_create().await.expect("create"));
            }
            requests
        });

        let outcome = performance(&cx, &scenario_b()).await.expect("performance");
        let requests: Vec<Request> = timeout_after_1s(mocksrv).await;

        assert_eq!(
            outcome,
            PerformanceOutcome {
                service: CreateOutcome::Created,
                config_map: CreateOutcome::Created,
                job: CreateOutcome::Created,
            }
        );
        assert_eq!(
            requests
                .iter()
                .map(|r| (r.method.as_str(), r.object_kind(), r.object_name()))
                .collect::<Vec<_>>(),
            vec![
                ("POST", "Service", "notification-service"),
                ("POST", "ConfigMap", "performance-test-configmap"),
                ("POST", "Job", "performance-test"),
            ]
        );
        assert!(requests[0]
            .uri
            .starts_with("/api/v1/namespaces/default/services?"));
        assert!(requests[2]
            .uri
            .starts_with("/apis/batch/v1/namespaces/default/jobs?"));

        let data = &requests[1].body["data"];
        assert_eq!(
            data["TEST_PEERS"],
            "peer0-peerset0-service:8080;peer0-peerset1-service:8080,peer1-peerset1-service:8080"
        );
        assert_eq!(
            data["NOTIFICATION_SERVICE_ADDRESS"],
            "http://notification-service:8080"
        );
        assert_eq!(data["SINGLE_PEERSET_CHANGES_NUMBER"], "3");
        assert_eq!(data["MULTIPLE_PEERSET_CHANGES_NUMBER"], "0");
        assert_eq!(data["TEST_DURATION"], "PT1S");
        assert_eq!(data["MAX_PEERSETS_IN_CHANGE"], "2");
        assert_eq!(data["TESTS_STRATEGY"], "delay_on_conflicts");

        let service = &requests[0].body;
        assert_eq!(service["metadata"]["labels"]["project"], "ucac");
        assert_eq!(service["metadata"]["labels"]["managed-by"], "ucac");
        assert_eq!(service["spec"]["selector"]["app.name"], "performanceTest");

        let job = &requests[2].body;
        assert_eq!(job["metadata"]["labels"]["app.name"], "performanceTest");
        assert_eq!(job["spec"]["backoffLimit"], 0);
        let pod = &job["spec"]["template"];
        assert_eq!(pod["metadata"]["labels"]["app.name"], "performanceTest");
        assert_eq!(pod["spec"]["restartPolicy"], "Never");
        assert_eq!(pod["spec"]["containers"].as_array().map(Vec::len), Some(1));
        assert_eq!(
            pod["spec"]["containers"][0]["envFrom"][0]["configMapRef"]["name"],
            "performance-test-configmap"
        );
    }

    #[tokio::test]
    async fn existing_objects_are_left_in_place() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver.handle_already_exists().await.expect("service");
            fakeserver.handle_create().await.expect("config map");
            fakeserver.handle_already_exists().await.expect("job");
        });

        let outcome = performance(&cx, &scenario_b()).await.expect("performance");
        timeout_after_1s(mocksrv).await;
        assert_eq!(
            outcome,
            PerformanceOutcome {
                service: CreateOutcome::AlreadyExists,
                config_map: CreateOutcome::Created,
                job: CreateOutcome::AlreadyExists,
            }
        );
    }

    #[tokio::test]
    async fn job_rejection_stops_with_transaction_error() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver.handle_create().await.expect("service");
            fakeserver.handle_create().await.expect("config map");
            fakeserver
                .handle_error(422, "Invalid")
                .await
                .expect("job")
        });

        let err = performance(&cx, &scenario_b()).await.unwrap_err();
        let request = timeout_after_1s(mocksrv).await;

        assert_eq!(request.object_kind(), "Job");
        assert_eq!(err.exit_code(), crate::error::EXIT_TRANSACTION);
        assert!(matches!(
            err,
            Error::Create { ref kind, ref namespace, ref name, .. }
                if kind == "Job" && namespace == "default" && name == "performance-test"
        ));
    }

    #[tokio::test]
    async fn service_rejection_skips_later_objects() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            fakeserver
                .handle_error(403, "Forbidden")
                .await
                .expect("service")
        });

        let err = performance(&cx, &scenario_b()).await.unwrap_err();
        timeout_after_1s(mocksrv).await;
        assert!(matches!(err, Error::Create { ref kind, .. } if kind == "Service"));
    }

    #[tokio::test]
    async fn creates_namespace_first_when_asked() {
        let (cx, handle) = Context::test(());
        let mut fakeserver = ApiServerVerifier::new(handle);
        let mocksrv = tokio::spawn(async move {
            let mut kinds = Vec::new();
            for _ in 0..4 {
                let request = fakeserver.handle_create().await.expect("create");
                kinds.push(request.object_kind().to_owned());
            }
            kinds
        });

        let config = PerformanceConfig {
            namespace: "perf".to_owned(),
            create_namespace: true,
            ..scenario_b()
        };
        performance(&cx, &config).await.expect("performance");
        assert_eq!(
            timeout_after_1s(mocksrv).await,
            vec!["Namespace", "Service", "ConfigMap", "Job"]
        );
    }

    #[test]
    fn harness_objects_are_consistent() {
        check_harness(
            &service::service_spec(),
            &job::job_spec(&JobImageConfig::default()),
        )
        .expect("consistent harness");
    }

    #[test]
    fn selector_mismatch_is_invalid() {
        let mut spec = service::service_spec();
        spec.selector = Some(project_labels());
        let err = check_harness(&spec, &job::job_spec(&JobImageConfig::default())).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INVALID);
        assert_eq!(
            err.to_string(),
            "invalid harness: service notification-service selector project=ucac does not match job performance-test pods"
        );
    }

    #[test]
    fn missing_config_map_reference_is_invalid() {
        let mut job = job::job_spec(&JobImageConfig::default());
        if let Some(pod) = job.template.spec.as_mut() {
            pod.containers[0].env_from = None;
        }
        let err = check_harness(&service::service_spec(), &job).unwrap_err();
        assert!(matches!(err, Error::InvalidHarness(_)));
    }
}
