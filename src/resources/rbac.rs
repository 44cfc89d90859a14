//! Service accounts, cluster roles and their bindings

use crate::resources::{cluster_meta, object_meta};
use crate::stack::{Instance, Member};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, RoleBinding, RoleRef, Subject,
};

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

const ALL_VERBS: &[&str] = &["create", "delete", "get", "list", "patch", "update", "watch"];
const READ_VERBS: &[&str] = &["get", "list", "watch"];

fn rule(groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(groups.iter().map(|s| s.to_string()).collect()),
        resources: Some(resources.iter().map(|s| s.to_string()).collect()),
        verbs: verbs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Name of the general ClusterRole shared by every stack of one version
pub fn cluster_role_name(instance: &Instance) -> String {
    format!("eclipse-codewind-{}", instance.version())
}

pub fn tekton_cluster_role_name(instance: &Instance) -> String {
    format!("eclipse-codewind-tekton-{}", instance.version())
}

pub fn role_binding_name(instance: &Instance) -> String {
    format!("codewind-rolebinding-{}", instance.workspace_id())
}

pub fn tekton_binding_name(instance: &Instance) -> String {
    format!("codewind-tekton-rolebinding-{}", instance.workspace_id())
}

pub fn service_account(instance: &Instance, member: Member) -> ServiceAccount {
    ServiceAccount {
        metadata: object_meta(instance, member, instance.service_account(member)),
        ..Default::default()
    }
}

/// Permissions the application server needs to build and run projects
pub fn cluster_role(instance: &Instance) -> ClusterRole {
    ClusterRole {
        metadata: cluster_meta(instance, Member::Pfe, cluster_role_name(instance)),
        rules: Some(vec![
            rule(
                &[""],
                &[
                    "pods",
                    "pods/log",
                    "pods/portforward",
                    "services",
                    "secrets",
                    "configmaps",
                    "serviceaccounts",
                    "persistentvolumeclaims",
                ],
                ALL_VERBS,
            ),
            rule(&[""], &["namespaces", "events"], READ_VERBS),
            rule(&["apps", "extensions"], &["deployments", "replicasets"], ALL_VERBS),
            rule(&["networking.k8s.io", "extensions"], &["ingresses"], ALL_VERBS),
            rule(&["route.openshift.io"], &["routes", "routes/custom-host"], ALL_VERBS),
            rule(&[RBAC_GROUP], &["roles", "rolebindings"], ALL_VERBS),
        ]),
        ..Default::default()
    }
}

/// Narrower permissions for reading Tekton pipelines from the dashboard
pub fn tekton_cluster_role(instance: &Instance) -> ClusterRole {
    ClusterRole {
        metadata: cluster_meta(instance, Member::Pfe, tekton_cluster_role_name(instance)),
        rules: Some(vec![
            rule(&[""], &["services"], READ_VERBS),
            rule(
                &["tekton.dev"],
                &["pipelines", "pipelineruns", "tasks", "taskruns"],
                READ_VERBS,
            ),
        ]),
        ..Default::default()
    }
}

fn pfe_subject(instance: &Instance) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: instance.service_account(Member::Pfe),
        namespace: Some(instance.namespace().to_string()),
        ..Default::default()
    }
}

fn cluster_role_ref(name: String) -> RoleRef {
    RoleRef {
        api_group: RBAC_GROUP.to_string(),
        kind: "ClusterRole".to_string(),
        name,
    }
}

/// Grant the general ClusterRole to the application server inside its namespace
pub fn role_binding(instance: &Instance) -> RoleBinding {
    RoleBinding {
        metadata: object_meta(instance, Member::Pfe, role_binding_name(instance)),
        role_ref: cluster_role_ref(cluster_role_name(instance)),
        subjects: Some(vec![pfe_subject(instance)]),
    }
}

/// Grant the Tekton ClusterRole cluster-wide
pub fn tekton_cluster_role_binding(instance: &Instance) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_meta(instance, Member::Pfe, tekton_binding_name(instance)),
        role_ref: cluster_role_ref(tekton_cluster_role_name(instance)),
        subjects: Some(vec![pfe_subject(instance)]),
    }
}
