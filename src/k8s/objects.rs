//! Resource kinds handled by the gateway and the objects it creates

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use kube::core::{ApiResource, GroupVersionKind};
use std::collections::BTreeMap;
use std::fmt;

/// API group served only by OpenShift clusters
pub const OPENSHIFT_ROUTE_GROUP: &str = "route.openshift.io";

/// ApiResource for OpenShift routes
pub fn route_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(OPENSHIFT_ROUTE_GROUP, "v1", "Route"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Deployment,
    Service,
    Secret,
    PersistentVolumeClaim,
    ServiceAccount,
    ClusterRole,
    RoleBinding,
    ClusterRoleBinding,
    Ingress,
    Route,
    Pod,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::ClusterRole => "ClusterRole",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Route => "Route",
            ResourceKind::Pod => "Pod",
        }
    }

    pub fn is_cluster_scoped(&self) -> bool {
        matches!(self, ResourceKind::ClusterRole | ResourceKind::ClusterRoleBinding)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object ready to be created in the cluster
#[derive(Debug, Clone)]
pub enum ClusterObject {
    Deployment(Deployment),
    Service(Service),
    Secret(Secret),
    PersistentVolumeClaim(PersistentVolumeClaim),
    ServiceAccount(ServiceAccount),
    RoleBinding(RoleBinding),
    ClusterRoleBinding(ClusterRoleBinding),
    Ingress(Ingress),
    Route(DynamicObject),
}

impl ClusterObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ClusterObject::Deployment(_) => ResourceKind::Deployment,
            ClusterObject::Service(_) => ResourceKind::Service,
            ClusterObject::Secret(_) => ResourceKind::Secret,
            ClusterObject::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
            ClusterObject::ServiceAccount(_) => ResourceKind::ServiceAccount,
            ClusterObject::RoleBinding(_) => ResourceKind::RoleBinding,
            ClusterObject::ClusterRoleBinding(_) => ResourceKind::ClusterRoleBinding,
            ClusterObject::Ingress(_) => ResourceKind::Ingress,
            ClusterObject::Route(_) => ResourceKind::Route,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ClusterObject::Deployment(o) => &o.metadata,
            ClusterObject::Service(o) => &o.metadata,
            ClusterObject::Secret(o) => &o.metadata,
            ClusterObject::PersistentVolumeClaim(o) => &o.metadata,
            ClusterObject::ServiceAccount(o) => &o.metadata,
            ClusterObject::RoleBinding(o) => &o.metadata,
            ClusterObject::ClusterRoleBinding(o) => &o.metadata,
            ClusterObject::Ingress(o) => &o.metadata,
            ClusterObject::Route(o) => &o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata().labels.clone().unwrap_or_default()
    }
}

/// ClusterRoles are created through a conditional create, so they get their own wrapper
pub fn cluster_role_name(role: &ClusterRole) -> &str {
    role.metadata.name.as_deref().unwrap_or_default()
}
