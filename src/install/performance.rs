//! Performance dashboard deployment

use crate::install::create_object;
use crate::k8s::{ClusterGateway, ClusterObject};
use crate::resources::workload::{Workload, deployment, service};
use crate::stack::{Instance, Member};
use crate::utils::errors::{CodewindError, Stage};

pub fn workload(instance: &Instance) -> Workload {
    Workload::default().env("IN_K8S", "true").env(
        "CODEWIND_URL_ROOT",
        format!(
            "https://{}:{}",
            instance.name(Member::Pfe),
            Member::Pfe.port()
        ),
    )
}

pub async fn deploy<G>(gateway: &G, instance: &Instance) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let member = Member::Performance;
    let stage = Stage::Deploy(member);

    create_object(gateway, instance, stage, ClusterObject::Service(service(instance, member))).await?;
    create_object(
        gateway,
        instance,
        stage,
        ClusterObject::Deployment(deployment(instance, member, workload(instance))),
    )
    .await
}
