//! Persistent volume claims

use crate::resources::object_meta;
use crate::stack::{Instance, Member};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// ReadWriteOnce claim of `size` for a member's data
pub fn pvc(instance: &Instance, member: Member, size: &str) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: object_meta(instance, member, instance.pvc_name(member)),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(size.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
