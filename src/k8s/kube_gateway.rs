//! [`ClusterGateway`] backed by a kube-rs client

use crate::k8s::gateway::{ClusterGateway, GatewayError, GatewayResult};
use crate::k8s::objects::{ClusterObject, ResourceKind, route_api_resource};
use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    Namespace, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// The API server rejects watch timeouts of 295s and above
const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

const INGRESS_NGINX: &str = "ingress-nginx";

pub struct KubeGateway {
    client: Client,
}

impl KubeGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig, or the inferred configuration
    /// (`KUBECONFIG`, then `~/.kube/config`, then in-cluster credentials)
    pub async fn connect(kubeconfig: Option<&Path>) -> anyhow::Result<Self> {
        let client = match kubeconfig {
            Some(path) => {
                let kc = Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
                let config = Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                    .await
                    .with_context(|| format!("Invalid kubeconfig {}", path.display()))?;
                Client::try_from(config).context("Failed to create Kubernetes client")?
            }
            None => Client::try_default()
                .await
                .context("Failed to create Kubernetes client")?,
        };
        Ok(Self::new(client))
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn routes(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &route_api_resource())
    }
}

async fn create_with<K>(api: Api<K>, object: &K, kind: ResourceKind) -> GatewayResult<()>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    let name = object.meta().name.clone().unwrap_or_default();
    debug!(%kind, %name, "creating");
    api.create(&PostParams::default(), object)
        .await
        .map(|_| ())
        .map_err(|e| GatewayError::from_kube("create", kind, &name, e))
}

async fn names_with<K>(api: Api<K>, selector: &str, kind: ResourceKind) -> GatewayResult<Vec<String>>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let list = api
        .list(&ListParams::default().labels(selector))
        .await
        .map_err(|e| GatewayError::from_kube("list", kind, selector, e))?;
    Ok(list.items.iter().map(|o| o.name_any()).collect())
}

async fn delete_with<K>(api: Api<K>, name: &str, kind: ResourceKind) -> GatewayResult<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    debug!(%kind, %name, "deleting");
    api.delete(name, &DeleteParams::background())
        .await
        .map(|_| ())
        .map_err(|e| GatewayError::from_kube("delete", kind, name, e))
}

/// Externally reachable address of an ingress controller service
fn service_address(service: &Service) -> Option<String> {
    let load_balancer_ip = service
        .status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.iter().find_map(|i| i.ip.clone()));

    load_balancer_ip.or_else(|| {
        service
            .spec
            .as_ref()
            .and_then(|s| s.cluster_ip.clone())
            .filter(|ip| !ip.is_empty() && ip != "None")
    })
}

fn is_ingress_controller(service: &Service) -> bool {
    let name = service.name_any();
    if name.contains("admission") {
        return false;
    }
    let labelled = service
        .labels()
        .get("app.kubernetes.io/name")
        .is_some_and(|v| v == INGRESS_NGINX);
    labelled || name.starts_with(INGRESS_NGINX)
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    fn current_namespace(&self) -> String {
        self.client.default_namespace().to_string()
    }

    async fn namespace_exists(&self, name: &str) -> GatewayResult<bool> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .get_opt(name)
            .await
            .map(|ns| ns.is_some())
            .map_err(|e| GatewayError::Other(format!("failed to get namespace '{}': {}", name, e)))
    }

    async fn create_namespace(&self, name: &str) -> GatewayResult<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let mut namespace = Namespace::default();
        namespace.metadata.name = Some(name.to_string());
        namespaces
            .create(&PostParams::default(), &namespace)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Other(format!("failed to create namespace '{}': {}", name, e)))
    }

    async fn api_groups(&self) -> GatewayResult<Vec<String>> {
        let groups = self
            .client
            .list_api_groups()
            .await
            .map_err(|e| GatewayError::Other(format!("failed to discover API groups: {}", e)))?;
        Ok(groups.groups.into_iter().map(|g| g.name).collect())
    }

    async fn ingress_controller_address(&self) -> GatewayResult<Option<String>> {
        let services: Api<Service> = Api::all(self.client.clone());
        let list = services
            .list(&ListParams::default())
            .await
            .map_err(|e| GatewayError::from_kube("list", ResourceKind::Service, INGRESS_NGINX, e))?;
        Ok(list
            .items
            .iter()
            .filter(|s| is_ingress_controller(s))
            .find_map(service_address))
    }

    async fn create(&self, namespace: &str, object: ClusterObject) -> GatewayResult<()> {
        let kind = object.kind();
        match &object {
            ClusterObject::Deployment(o) => create_with(self.namespaced(namespace), o, kind).await,
            ClusterObject::Service(o) => create_with(self.namespaced(namespace), o, kind).await,
            ClusterObject::Secret(o) => create_with(self.namespaced(namespace), o, kind).await,
            ClusterObject::PersistentVolumeClaim(o) => {
                create_with(self.namespaced(namespace), o, kind).await
            }
            ClusterObject::ServiceAccount(o) => {
                create_with(self.namespaced(namespace), o, kind).await
            }
            ClusterObject::RoleBinding(o) => create_with(self.namespaced(namespace), o, kind).await,
            ClusterObject::ClusterRoleBinding(o) => {
                create_with(Api::<ClusterRoleBinding>::all(self.client.clone()), o, kind).await
            }
            ClusterObject::Ingress(o) => create_with(self.namespaced(namespace), o, kind).await,
            ClusterObject::Route(o) => create_with(self.routes(namespace), o, kind).await,
        }
    }

    async fn create_cluster_role_if_absent(&self, role: ClusterRole) -> GatewayResult<bool> {
        let roles: Api<ClusterRole> = Api::all(self.client.clone());
        match create_with(roles, &role, ResourceKind::ClusterRole).await {
            Ok(()) => Ok(true),
            Err(GatewayError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_names(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &str,
    ) -> GatewayResult<Vec<String>> {
        match kind {
            ResourceKind::Deployment => {
                names_with(self.namespaced::<Deployment>(namespace), selector, kind).await
            }
            ResourceKind::Service => {
                names_with(self.namespaced::<Service>(namespace), selector, kind).await
            }
            ResourceKind::Secret => {
                names_with(self.namespaced::<Secret>(namespace), selector, kind).await
            }
            ResourceKind::PersistentVolumeClaim => {
                names_with(self.namespaced::<PersistentVolumeClaim>(namespace), selector, kind)
                    .await
            }
            ResourceKind::ServiceAccount => {
                names_with(self.namespaced::<ServiceAccount>(namespace), selector, kind).await
            }
            ResourceKind::ClusterRole => {
                names_with(Api::<ClusterRole>::all(self.client.clone()), selector, kind).await
            }
            ResourceKind::RoleBinding => {
                names_with(self.namespaced::<RoleBinding>(namespace), selector, kind).await
            }
            ResourceKind::ClusterRoleBinding => {
                names_with(Api::<ClusterRoleBinding>::all(self.client.clone()), selector, kind)
                    .await
            }
            ResourceKind::Ingress => {
                names_with(self.namespaced::<Ingress>(namespace), selector, kind).await
            }
            ResourceKind::Route => names_with(self.routes(namespace), selector, kind).await,
            ResourceKind::Pod => names_with(self.namespaced::<Pod>(namespace), selector, kind).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> GatewayResult<()> {
        match kind {
            ResourceKind::Deployment => {
                delete_with(self.namespaced::<Deployment>(namespace), name, kind).await
            }
            ResourceKind::Service => {
                delete_with(self.namespaced::<Service>(namespace), name, kind).await
            }
            ResourceKind::Secret => delete_with(self.namespaced::<Secret>(namespace), name, kind).await,
            ResourceKind::PersistentVolumeClaim => {
                delete_with(self.namespaced::<PersistentVolumeClaim>(namespace), name, kind).await
            }
            ResourceKind::ServiceAccount => {
                delete_with(self.namespaced::<ServiceAccount>(namespace), name, kind).await
            }
            ResourceKind::ClusterRole => {
                delete_with(Api::<ClusterRole>::all(self.client.clone()), name, kind).await
            }
            ResourceKind::RoleBinding => {
                delete_with(self.namespaced::<RoleBinding>(namespace), name, kind).await
            }
            ResourceKind::ClusterRoleBinding => {
                delete_with(Api::<ClusterRoleBinding>::all(self.client.clone()), name, kind).await
            }
            ResourceKind::Ingress => {
                delete_with(self.namespaced::<Ingress>(namespace), name, kind).await
            }
            ResourceKind::Route => delete_with(self.routes(namespace), name, kind).await,
            ResourceKind::Pod => delete_with(self.namespaced::<Pod>(namespace), name, kind).await,
        }
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> GatewayResult<Vec<Deployment>> {
        let api: Api<Deployment> = match namespace {
            Some(ns) => self.namespaced(ns),
            None => Api::all(self.client.clone()),
        };
        api.list(&ListParams::default().labels(selector))
            .await
            .map(|list| list.items)
            .map_err(|e| GatewayError::from_kube("list", ResourceKind::Deployment, selector, e))
    }

    async fn watch_pods(
        &self,
        namespace: &str,
        selector: &str,
        timeout_secs: u32,
    ) -> GatewayResult<mpsc::Receiver<GatewayResult<Pod>>> {
        let pods: Api<Pod> = self.namespaced(namespace);
        let params = WatchParams::default()
            .labels(selector)
            .timeout(timeout_secs.clamp(1, MAX_WATCH_TIMEOUT_SECS));
        let watch_selector = selector.to_string();
        let (opened_tx, opened_rx) = oneshot::channel();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let selector = watch_selector;
            let stream = match pods.watch(&params, "0").await {
                Ok(stream) => {
                    let _ = opened_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = opened_tx.send(Err(GatewayError::from_kube(
                        "watch",
                        ResourceKind::Pod,
                        &selector,
                        e,
                    )));
                    return;
                }
            };
            let mut stream = Box::pin(stream);
            while let Some(event) = stream.next().await {
                let item = match event {
                    Ok(WatchEvent::Added(pod)) | Ok(WatchEvent::Modified(pod)) => Ok(pod),
                    Ok(WatchEvent::Error(status)) => Err(GatewayError::Watch {
                        selector: selector.clone(),
                        code: Some(status.code),
                        message: status.message.clone(),
                    }),
                    Ok(_) => continue,
                    // Rejections such as 403 arrive as a Status line in the stream
                    Err(e) => Err(GatewayError::from_kube("watch", ResourceKind::Pod, &selector, e)),
                };
                let failed = item.is_err();
                if let Err(e) = &item {
                    warn!(%selector, error = %e, "pod watch failed");
                }
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
            debug!(%selector, "pod watch closed by server");
        });

        match opened_rx.await {
            Ok(Ok(())) => Ok(rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GatewayError::Other(format!(
                "pod watch on '{}' ended before it was opened",
                selector
            ))),
        }
    }
}
