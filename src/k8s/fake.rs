//! In-memory [`ClusterGateway`] for tests, with fault injection

use crate::k8s::gateway::{ClusterGateway, GatewayError, GatewayResult};
use crate::k8s::objects::{ClusterObject, ResourceKind, cluster_role_name};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use k8s_openapi::api::rbac::v1::ClusterRole;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A pod in the given phase
pub fn pod(name: &str, phase: &str) -> Pod {
    let mut pod = Pod::default();
    pod.metadata.name = Some(name.to_string());
    pod.status = Some(PodStatus {
        phase: Some(phase.to_string()),
        ..Default::default()
    });
    pod
}

fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key).is_some_and(|v| v == value),
            None => labels.contains_key(term),
        })
}

enum WatchScript {
    Events(Vec<Pod>),
    /// Deliver the pods, then a server error with this code
    Fails(Vec<Pod>, u16, String),
    /// The watch cannot be opened
    Refused(String),
}

struct State {
    current_namespace: String,
    namespaces: BTreeSet<String>,
    openshift: bool,
    ingress_address: Option<String>,
    objects: Vec<(String, ClusterObject)>,
    cluster_roles: BTreeMap<String, ClusterRole>,
    created: Vec<(ResourceKind, String)>,
    failing: HashSet<ResourceKind>,
    failing_creates: HashSet<ResourceKind>,
    watches: VecDeque<WatchScript>,
    watch_count: usize,
}

pub struct FakeGateway {
    state: Mutex<State>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                current_namespace: "default".to_string(),
                namespaces: BTreeSet::from(["default".to_string()]),
                openshift: false,
                ingress_address: None,
                objects: Vec::new(),
                cluster_roles: BTreeMap::new(),
                created: Vec::new(),
                failing: HashSet::new(),
                failing_creates: HashSet::new(),
                watches: VecDeque::new(),
                watch_count: 0,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_openshift(&self, openshift: bool) {
        self.state().openshift = openshift;
    }

    pub fn set_ingress_address(&self, address: &str) {
        self.state().ingress_address = Some(address.to_string());
    }

    pub fn set_current_namespace(&self, namespace: &str) {
        self.state().current_namespace = namespace.to_string();
    }

    pub fn add_namespace(&self, namespace: &str) {
        self.state().namespaces.insert(namespace.to_string());
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.state().namespaces.contains(namespace)
    }

    /// Seed an object as if an earlier run had created it
    pub fn insert(&self, namespace: &str, object: ClusterObject) {
        self.state().objects.push((namespace.to_string(), object));
    }

    pub fn insert_cluster_role(&self, role: ClusterRole) {
        let name = cluster_role_name(&role).to_string();
        self.state().cluster_roles.insert(name, role);
    }

    /// Make list and delete calls for `kind` fail
    pub fn fail_kind(&self, kind: ResourceKind) {
        self.state().failing.insert(kind);
    }

    /// Make create calls for `kind` fail
    pub fn fail_create(&self, kind: ResourceKind) {
        self.state().failing_creates.insert(kind);
    }

    /// Queue the pods delivered by the next pod watch.
    /// Unscripted watches deliver a single Running pod.
    pub fn script_watch(&self, pods: Vec<Pod>) {
        self.state().watches.push_back(WatchScript::Events(pods));
    }

    /// Queue a watch that delivers `pods` and then fails with an HTTP `code`
    pub fn script_watch_failure(&self, pods: Vec<Pod>, code: u16, message: &str) {
        self.state()
            .watches
            .push_back(WatchScript::Fails(pods, code, message.to_string()));
    }

    /// Queue a watch that cannot be opened
    pub fn refuse_watch(&self, message: &str) {
        self.state().watches.push_back(WatchScript::Refused(message.to_string()));
    }

    pub fn watch_count(&self) -> usize {
        self.state().watch_count
    }

    /// Kinds and names of every successful create, in call order
    pub fn created(&self) -> Vec<(ResourceKind, String)> {
        self.state().created.clone()
    }

    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.state().created.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Objects currently stored
    pub fn objects(&self, kind: ResourceKind) -> Vec<ClusterObject> {
        self.state()
            .objects
            .iter()
            .filter(|(_, o)| o.kind() == kind)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    pub fn cluster_role_names(&self) -> Vec<String> {
        self.state().cluster_roles.keys().cloned().collect()
    }
}

#[async_trait]
impl ClusterGateway for FakeGateway {
    fn current_namespace(&self) -> String {
        self.state().current_namespace.clone()
    }

    async fn namespace_exists(&self, name: &str) -> GatewayResult<bool> {
        Ok(self.state().namespaces.contains(name))
    }

    async fn create_namespace(&self, name: &str) -> GatewayResult<()> {
        if !self.state().namespaces.insert(name.to_string()) {
            return Err(GatewayError::Other(format!("namespace '{}' already exists", name)));
        }
        Ok(())
    }

    async fn api_groups(&self) -> GatewayResult<Vec<String>> {
        let mut groups = vec!["apps".to_string(), "networking.k8s.io".to_string()];
        if self.state().openshift {
            groups.push("route.openshift.io".to_string());
        }
        Ok(groups)
    }

    async fn ingress_controller_address(&self) -> GatewayResult<Option<String>> {
        Ok(self.state().ingress_address.clone())
    }

    async fn create(&self, namespace: &str, object: ClusterObject) -> GatewayResult<()> {
        let mut state = self.state();
        let kind = object.kind();
        let name = object.name().to_string();
        let namespace = if kind.is_cluster_scoped() { "" } else { namespace };

        if state.failing_creates.contains(&kind) {
            return Err(GatewayError::Other(format!("injected create failure for {}", kind)));
        }
        let exists = state
            .objects
            .iter()
            .any(|(ns, o)| ns == namespace && o.kind() == kind && o.name() == name);
        if exists {
            return Err(GatewayError::AlreadyExists { kind, name });
        }

        state.created.push((kind, name));
        state.objects.push((namespace.to_string(), object));
        Ok(())
    }

    async fn create_cluster_role_if_absent(&self, role: ClusterRole) -> GatewayResult<bool> {
        let mut state = self.state();
        let name = cluster_role_name(&role).to_string();
        if state.cluster_roles.contains_key(&name) {
            return Ok(false);
        }
        state.created.push((ResourceKind::ClusterRole, name.clone()));
        state.cluster_roles.insert(name, role);
        Ok(true)
    }

    async fn list_names(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &str,
    ) -> GatewayResult<Vec<String>> {
        let state = self.state();
        if state.failing.contains(&kind) {
            return Err(GatewayError::Other(format!("injected list failure for {}", kind)));
        }
        if kind == ResourceKind::ClusterRole {
            return Ok(state
                .cluster_roles
                .iter()
                .filter(|(_, r)| {
                    selector_matches(selector, &r.metadata.labels.clone().unwrap_or_default())
                })
                .map(|(name, _)| name.clone())
                .collect());
        }
        let namespace = if kind.is_cluster_scoped() { "" } else { namespace };
        Ok(state
            .objects
            .iter()
            .filter(|(ns, o)| ns == namespace && o.kind() == kind)
            .filter(|(_, o)| selector_matches(selector, &o.labels()))
            .map(|(_, o)| o.name().to_string())
            .collect())
    }

    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> GatewayResult<()> {
        let mut state = self.state();
        if state.failing.contains(&kind) {
            return Err(GatewayError::Other(format!("injected delete failure for {}", kind)));
        }
        let namespace = if kind.is_cluster_scoped() { "" } else { namespace };
        let before = state.objects.len();
        state
            .objects
            .retain(|(ns, o)| !(ns == namespace && o.kind() == kind && o.name() == name));
        if state.objects.len() == before {
            return Err(GatewayError::Other(format!("{} '{}' not found", kind, name)));
        }
        Ok(())
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> GatewayResult<Vec<Deployment>> {
        let state = self.state();
        if state.failing.contains(&ResourceKind::Deployment) {
            return Err(GatewayError::Other("injected list failure for Deployment".to_string()));
        }
        Ok(state
            .objects
            .iter()
            .filter(|(ns, _)| namespace.is_none_or(|want| want == ns))
            .filter_map(|(_, o)| match o {
                ClusterObject::Deployment(d) if selector_matches(selector, &o.labels()) => {
                    Some(d.clone())
                }
                _ => None,
            })
            .collect())
    }

    async fn watch_pods(
        &self,
        _namespace: &str,
        selector: &str,
        _timeout_secs: u32,
    ) -> GatewayResult<mpsc::Receiver<GatewayResult<Pod>>> {
        let mut state = self.state();
        state.watch_count += 1;
        let script = state
            .watches
            .pop_front()
            .unwrap_or_else(|| WatchScript::Events(vec![pod(&format!("{}-pod", selector), "Running")]));

        let mut events: Vec<GatewayResult<Pod>> = Vec::new();
        match script {
            WatchScript::Events(pods) => events.extend(pods.into_iter().map(Ok)),
            WatchScript::Fails(pods, code, message) => {
                events.extend(pods.into_iter().map(Ok));
                events.push(Err(GatewayError::Watch {
                    selector: selector.to_string(),
                    code: Some(code),
                    message,
                }));
            }
            WatchScript::Refused(message) => return Err(GatewayError::Other(message)),
        }

        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this never blocks
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches() {
        let labels = BTreeMap::from([
            ("app".to_string(), "codewind-pfe".to_string()),
            ("codewindWorkspace".to_string(), "abc".to_string()),
        ]);
        assert!(selector_matches("app=codewind-pfe,codewindWorkspace=abc", &labels));
        assert!(selector_matches("codewindWorkspace=abc", &labels));
        assert!(selector_matches("app", &labels));
        assert!(!selector_matches("codewindWorkspace=xyz", &labels));
    }
}
