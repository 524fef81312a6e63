use k8s_openapi::{
    api::core::v1::{ServicePort, ServiceSpec},
    apimachinery::pkg::util::intstr::IntOrString,
};

use crate::{labels::harness_labels, performance::HARNESS_PORT};

/// Service fronting the harness pod so peers can report back to it.
pub fn service_spec() -> ServiceSpec {
    ServiceSpec {
        ports: Some(vec![ServicePort {
            name: Some("service".to_owned()),
            port: HARNESS_PORT,
            target_port: Some(IntOrString::Int(HARNESS_PORT)),
            ..Default::default()
        }]),
        selector: Some(harness_labels()),
        ..Default::default()
    }
}
