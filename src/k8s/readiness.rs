//! Pod readiness waits

use crate::config::settings::Readiness;
use crate::k8s::gateway::{ClusterGateway, GatewayResult};
use crate::stack::Member;
use crate::utils::errors::{CodewindError, Stage};
use crate::utils::progress::WaitProgress;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::collections::HashMap;
use std::time::Duration;

const RUNNING: &str = "Running";

fn phase_of(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown")
}

/// Watch pods matching `selector` until one is Running.
///
/// Returns `Ok(true)` as soon as a pod reports phase Running and `Ok(false)`
/// when the watch closes first. Errors reported by the watch are returned.
pub async fn wait_for_running<G>(
    gateway: &G,
    namespace: &str,
    selector: &str,
    timeout_secs: u32,
    progress: &WaitProgress,
) -> GatewayResult<bool>
where
    G: ClusterGateway + ?Sized,
{
    let mut events = gateway.watch_pods(namespace, selector, timeout_secs).await?;
    let mut phases: HashMap<String, String> = HashMap::new();

    while let Some(event) = events.recv().await {
        let pod = event?;
        let name = pod.name_any();
        let phase = phase_of(&pod).to_string();

        if let Some(conditions) = pod.status.as_ref().and_then(|s| s.conditions.as_ref()) {
            for condition in conditions {
                tracing::debug!(pod = %name, condition = %condition.type_, status = %condition.status, "pod condition");
            }
        }

        if phases.get(&name) != Some(&phase) {
            crate::log_info!("Pod {} is {}", name, phase);
            progress.update(&phase);
            phases.insert(name, phase.clone());
        }

        if phase == RUNNING {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Block until a member's pod is Running, re-opening the watch up to
/// `policy.attempts` times with a linear backoff between attempts.
///
/// A watch the cluster forbids fails at once. Other watch errors are retried
/// and the last one is attached to the final error.
pub async fn wait_until_ready<G>(
    gateway: &G,
    namespace: &str,
    workspace_id: &str,
    member: Member,
    policy: &Readiness,
    show_progress: bool,
) -> Result<(), CodewindError>
where
    G: ClusterGateway + ?Sized,
{
    let selector = member.selector(workspace_id);
    let resource = format!("{}-{}", member.prefix(), workspace_id);
    let progress = WaitProgress::new(&resource, RUNNING, show_progress);
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match wait_for_running(gateway, namespace, &selector, policy.watch_timeout_secs, &progress)
            .await
        {
            Ok(true) => {
                progress.finish_success();
                return Ok(());
            }
            Ok(false) => {
                crate::log_info!(
                    "Watch for {} closed before it was Running (attempt {}/{})",
                    resource,
                    attempt,
                    attempts
                );
            }
            Err(e) if e.is_forbidden() => {
                progress.finish_error("forbidden");
                return Err(CodewindError::cluster(
                    Stage::WaitReady(member),
                    format!("Unable to watch pods of {}", resource),
                    e,
                ));
            }
            Err(e) => {
                crate::log_warn!(
                    "Unable to watch {} (attempt {}/{}): {}",
                    resource,
                    attempt,
                    attempts,
                    e
                );
                last_error = Some(e);
            }
        }

        if attempt < attempts && policy.backoff_secs > 0 {
            tokio::time::sleep(Duration::from_secs(policy.backoff_secs * attempt as u64)).await;
        }
    }

    progress.finish_error("not running");
    let err = CodewindError::not_ready(member, namespace, attempts);
    Err(match last_error {
        Some(e) => err.with_source(e),
        None => err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::fake::{FakeGateway, pod};

    fn policy(attempts: u32) -> Readiness {
        Readiness {
            attempts,
            watch_timeout_secs: 5,
            backoff_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_running_pod_returns_true() {
        let gateway = FakeGateway::new();
        gateway.script_watch(vec![pod("p1", "Pending"), pod("p1", "Running")]);

        let progress = WaitProgress::new("p1", "Running", false);
        let ready = wait_for_running(&gateway, "ns", "app=x", 5, &progress).await.unwrap();
        assert!(ready);
    }

    #[tokio::test]
    async fn test_closed_watch_returns_false() {
        let gateway = FakeGateway::new();
        gateway.script_watch(vec![pod("p1", "Pending")]);

        let progress = WaitProgress::new("p1", "Running", false);
        let ready = wait_for_running(&gateway, "ns", "app=x", 5, &progress).await.unwrap();
        assert!(!ready);
    }

    #[tokio::test]
    async fn test_retry_until_running() {
        let gateway = FakeGateway::new();
        gateway.script_watch(vec![pod("p1", "Pending")]);
        gateway.script_watch(vec![pod("p1", "ContainerCreating")]);
        gateway.script_watch(vec![pod("p1", "Running")]);

        wait_until_ready(&gateway, "ns", "abc", Member::Pfe, &policy(5), false)
            .await
            .unwrap();
        assert_eq!(gateway.watch_count(), 3);
    }

    #[tokio::test]
    async fn test_bounded_retries() {
        let gateway = FakeGateway::new();
        for _ in 0..3 {
            gateway.script_watch(vec![pod("p1", "Pending")]);
        }

        let err = wait_until_ready(&gateway, "ns", "abc", Member::Keycloak, &policy(2), false)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::WaitReady(Member::Keycloak));
        assert_eq!(gateway.watch_count(), 2);
    }

    #[tokio::test]
    async fn test_watch_error_is_returned() {
        let gateway = FakeGateway::new();
        gateway.script_watch_failure(vec![pod("p1", "Pending")], 500, "etcd leader changed");

        let progress = WaitProgress::new("p1", "Running", false);
        let err = wait_for_running(&gateway, "ns", "app=x", 5, &progress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("etcd leader changed"));
    }

    #[tokio::test]
    async fn test_watch_errors_are_retried_and_kept_as_source() {
        let gateway = FakeGateway::new();
        gateway.refuse_watch("connection refused");
        gateway.script_watch_failure(Vec::new(), 500, "etcd leader changed");

        let err = wait_until_ready(&gateway, "ns", "abc", Member::Pfe, &policy(2), false)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::WaitReady(Member::Pfe));
        assert_eq!(gateway.watch_count(), 2);
        assert!(err.description().contains("etcd leader changed"), "{}", err.description());
    }

    #[tokio::test]
    async fn test_forbidden_watch_is_not_retried() {
        let gateway = FakeGateway::new();
        gateway.script_watch_failure(Vec::new(), 403, "pods is forbidden");

        let err = wait_until_ready(&gateway, "ns", "abc", Member::Keycloak, &policy(5), false)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::WaitReady(Member::Keycloak));
        assert_eq!(gateway.watch_count(), 1);
        assert!(!err.suggestions.is_empty());
    }
}
