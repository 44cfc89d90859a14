//! Deployments and Services

use crate::resources::{labels, object_meta};
use crate::stack::{Instance, Member};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, SecretKeySelector, SecretVolumeSource, SecurityContext, Service,
    ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Member specific parts of a Deployment
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub privileged: bool,
    pub env: Vec<EnvVar>,
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
}

impl Workload {
    pub fn env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.push(EnvVar {
            name: name.to_string(),
            value: Some(value.into()),
            ..Default::default()
        });
        self
    }

    /// Env var read from one key of a Secret
    pub fn secret_env(mut self, name: &str, secret: &str, key: &str) -> Self {
        self.env.push(EnvVar {
            name: name.to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret.to_string(),
                    key: key.to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
        self
    }

    pub fn pvc_volume(mut self, volume: &str, claim: &str, mount_path: &str) -> Self {
        self.volumes.push(Volume {
            name: volume.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        self.mount(volume, mount_path)
    }

    pub fn secret_volume(mut self, volume: &str, secret: &str, mount_path: &str) -> Self {
        self.volumes.push(Volume {
            name: volume.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        self.mount(volume, mount_path)
    }

    fn mount(mut self, volume: &str, mount_path: &str) -> Self {
        self.mounts.push(VolumeMount {
            name: volume.to_string(),
            mount_path: mount_path.to_string(),
            ..Default::default()
        });
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

/// Single replica Deployment named `{prefix}-{workspaceID}`
pub fn deployment(instance: &Instance, member: Member, workload: Workload) -> Deployment {
    let labels = labels(instance, member);

    let container = Container {
        name: member.prefix().to_string(),
        image: Some(instance.image(member)),
        image_pull_policy: Some("Always".to_string()),
        ports: Some(vec![ContainerPort {
            name: Some(member.short().to_string()),
            container_port: member.port(),
            ..Default::default()
        }]),
        env: Some(workload.env),
        volume_mounts: Some(workload.mounts),
        security_context: Some(SecurityContext {
            privileged: Some(workload.privileged),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(instance, member, instance.name(member)),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(instance.service_account(member)),
                    containers: vec![container],
                    volumes: Some(workload.volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// ClusterIP Service with one port named after the member
pub fn service(instance: &Instance, member: Member) -> Service {
    Service {
        metadata: object_meta(instance, member, instance.name(member)),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(labels(instance, member)),
            ports: Some(vec![ServicePort {
                name: Some(member.short().to_string()),
                port: member.port(),
                target_port: Some(IntOrString::Int(member.port())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
