//! Resource generators
//!
//! Pure functions turning an [`Instance`] into the typed objects the
//! orchestrator creates. Nothing here talks to the cluster.
//!
//! Every generated object carries the `app=<member prefix>` and
//! `codewindWorkspace=<workspace id>` labels; removal and inventory locate
//! objects through those two labels alone.

pub mod exposure;
pub mod rbac;
pub mod secrets;
pub mod storage;
pub mod workload;

use crate::stack::{APP_LABEL, Instance, Member, WORKSPACE_LABEL};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

pub use exposure::{Exposure, Termination};

/// The two identifying labels of a member's objects
pub fn labels(instance: &Instance, member: Member) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), member.prefix().to_string()),
        (WORKSPACE_LABEL.to_string(), instance.workspace_id().to_string()),
    ])
}

fn owner_references(instance: &Instance) -> Option<Vec<OwnerReference>> {
    instance.owner().map(|owner| {
        vec![OwnerReference {
            api_version: owner.api_version.clone(),
            kind: owner.kind.clone(),
            name: owner.name.clone(),
            uid: owner.uid.clone(),
            block_owner_deletion: Some(true),
            controller: Some(true),
        }]
    })
}

/// Metadata for a namespaced object owned by `member`
pub fn object_meta(instance: &Instance, member: Member, name: impl Into<String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        namespace: Some(instance.namespace().to_string()),
        labels: Some(labels(instance, member)),
        owner_references: owner_references(instance),
        ..Default::default()
    }
}

/// Metadata for a cluster-scoped object. Owner references are namespaced, so none are set.
pub fn cluster_meta(instance: &Instance, member: Member, name: impl Into<String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.into()),
        labels: Some(labels(instance, member)),
        ..Default::default()
    }
}
