//! Utils is shared functions and constants for the provisioning workflows

use std::{collections::BTreeMap, fmt::Debug};

use k8s_openapi::api::{
    batch::v1::{Job, JobSpec},
    core::v1::{ConfigMap, Namespace, Service, ServiceSpec},
};
use kube::{
    api::PostParams, client::Client, config::KubeConfigOptions, core::ObjectMeta, Api, Resource,
    ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::{error::Error, labels::managed_labels_extend, FIELD_MANAGER};

/// Operator Context
pub struct Context<P> {
    /// Kube client
    pub k_client: Client,
    /// Package manager used to install chart releases
    pub package_manager: P,
}

impl<P> Context<P> {
    /// Create new context
    pub fn new(k_client: Client, package_manager: P) -> Self {
        Context {
            k_client,
            package_manager,
        }
    }
}

/// Kubeconfig options selecting `context`, or the current context without one.
pub fn kube_config_options(context: Option<&str>) -> KubeConfigOptions {
    KubeConfigOptions {
        context: context.map(str::to_owned),
        ..Default::default()
    }
}

/// Create a kube client for `context`.
///
/// Without a context the ambient configuration is used, falling back to the
/// in-cluster service account.
pub async fn kube_client(context: Option<&str>) -> Result<Client, Error> {
    match context {
        None => Ok(Client::try_default().await?),
        Some(context) => {
            let config = kube::Config::from_kubeconfig(&kube_config_options(Some(context))).await?;
            Ok(Client::try_from(config)?)
        }
    }
}

/// Result of a create call that treats existing objects as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The object was created by this call.
    Created,
    /// An object with the same name was already present.
    AlreadyExists,
}

/// Create an object, treating an existing object of the same name as success.
///
/// Every other error is surfaced as [`Error::Create`]. No retries are attempted.
pub async fn create_or_exists<K>(api: &Api<K>, resource: &K) -> Result<CreateOutcome, Error>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug,
{
    let kind = K::kind(&()).into_owned();
    let name = resource.name_any();
    let namespace = resource.namespace().unwrap_or_default();
    let params = PostParams {
        field_manager: Some(FIELD_MANAGER.to_owned()),
        ..Default::default()
    };
    match api.create(&params, resource).await {
        Ok(_) => {
            info!(%kind, %namespace, %name, "created");
            Ok(CreateOutcome::Created)
        }
        Err(kube::Error::Api(err)) if err.reason == "AlreadyExists" => {
            debug!(%kind, %namespace, %name, message = %err.message, "already exists");
            info!(%kind, %namespace, %name, "already exists, leaving as is");
            Ok(CreateOutcome::AlreadyExists)
        }
        Err(source) => Err(Error::Create {
            kind,
            namespace,
            name,
            source,
        }),
    }
}

/// Create a namespace
pub async fn create_namespace<P>(cx: &Context<P>, name: &str) -> Result<CreateOutcome, Error> {
    let namespaces: Api<Namespace> = Api::all(cx.k_client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            labels: managed_labels_extend(BTreeMap::new()),
            ..ObjectMeta::default()
        },
        ..Default::default()
    };
    create_or_exists(&namespaces, &namespace).await
}

/// Create a Service with extra labels
pub async fn create_service<P>(
    cx: &Context<P>,
    ns: &str,
    name: &str,
    spec: ServiceSpec,
    labels: BTreeMap<String, String>,
) -> Result<CreateOutcome, Error> {
    let services: Api<Service> = Api::namespaced(cx.k_client.clone(), ns);
    let service = Service {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(ns.to_owned()),
            labels: managed_labels_extend(labels),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        ..Default::default()
    };
    create_or_exists(&services, &service).await
}

/// Create a config map with extra labels
pub async fn create_config_map<P>(
    cx: &Context<P>,
    ns: &str,
    name: &str,
    data: BTreeMap<String, String>,
    labels: BTreeMap<String, String>,
) -> Result<CreateOutcome, Error> {
    let config_maps: Api<ConfigMap> = Api::namespaced(cx.k_client.clone(), ns);
    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(ns.to_owned()),
            labels: managed_labels_extend(labels),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..Default::default()
    };
    create_or_exists(&config_maps, &config_map).await
}

/// Create a Job with extra labels
pub async fn create_job<P>(
    cx: &Context<P>,
    ns: &str,
    name: &str,
    spec: JobSpec,
    labels: BTreeMap<String, String>,
) -> Result<CreateOutcome, Error> {
    let jobs: Api<Job> = Api::namespaced(cx.k_client.clone(), ns);
    let job = Job {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(ns.to_owned()),
            labels: managed_labels_extend(labels),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        ..Default::default()
    };
    create_or_exists(&jobs, &job).await
}
