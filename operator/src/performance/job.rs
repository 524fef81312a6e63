use k8s_openapi::api::{
    batch::v1::JobSpec,
    core::v1::{
        ConfigMapEnvSource, Container, ContainerPort, EnvFromSource, PodSpec, PodTemplateSpec,
    },
};
use kube::core::ObjectMeta;

use crate::{
    labels::harness_labels,
    performance::{CONFIG_MAP_NAME, HARNESS_PORT},
};

/// Container name of the harness.
pub const HARNESS_CONTAINER_NAME: &str = "performance-test";

/// Image settings of the harness container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobImageConfig {
    /// Image running the load generator.
    pub image: String,
    /// Pull policy, left to the cluster default when unset.
    pub image_pull_policy: Option<String>,
}

impl Default for JobImageConfig {
    fn default() -> Self {
        Self {
            image: "ghcr.io/davenury/performance:latest".to_owned(),
            image_pull_policy: None,
        }
    }
}

/// Run-to-completion Job with a single harness container reading its
/// environment from the harness ConfigMap. Failed pods are not retried.
pub fn job_spec(config: &JobImageConfig) -> JobSpec {
    JobSpec {
        backoff_limit: Some(0),
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(harness_labels()),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: HARNESS_CONTAINER_NAME.to_owned(),
                    image: Some(config.image.to_owned()),
                    image_pull_policy: config.image_pull_policy.to_owned(),
                    ports: Some(vec![ContainerPort {
                        container_port: HARNESS_PORT,
                        ..Default::default()
                    }]),
                    env_from: Some(vec![EnvFromSource {
                        config_map_ref: Some(ConfigMapEnvSource {
                            name: Some(CONFIG_MAP_NAME.to_owned()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                restart_policy: Some("Never".to_owned()),
                ..Default::default()
            }),
        },
        ..Default::default()
    }
}
