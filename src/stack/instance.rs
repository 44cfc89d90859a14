//! The in-memory descriptor of one deployed stack

use crate::config::images::ImageSet;
use crate::resources::exposure::Exposure;
use crate::stack::Member;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_WORKSPACE_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Generate a workspace ID from the current time.
///
/// The ID is the base-36 rendering of a millisecond timestamp. Two calls in the
/// same millisecond get consecutive values, so IDs never repeat within a process.
pub fn generate_workspace_id() -> String {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut prev = LAST_WORKSPACE_MILLIS.load(Ordering::SeqCst);
    loop {
        let next = now.max(prev + 1);
        match LAST_WORKSPACE_MILLIS.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return to_base36(next),
            Err(actual) => prev = actual,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Owner whose deletion garbage-collects the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// Names, images and placement of one stack, built once per deployment
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    workspace_id: String,
    namespace: String,
    ingress_domain: String,
    on_openshift: bool,
    images: ImageSet,
    owner: Option<OwnerRef>,
}

impl Instance {
    pub fn new(
        workspace_id: impl Into<String>,
        namespace: impl Into<String>,
        ingress_domain: impl Into<String>,
        on_openshift: bool,
        images: ImageSet,
        owner: Option<OwnerRef>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            namespace: namespace.into(),
            ingress_domain: ingress_domain.into(),
            on_openshift,
            images,
            owner,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ingress_domain(&self) -> &str {
        &self.ingress_domain
    }

    pub fn on_openshift(&self) -> bool {
        self.on_openshift
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    /// How exposed members are published on this cluster
    pub fn exposure(&self) -> Exposure {
        if self.on_openshift {
            Exposure::Route
        } else {
            Exposure::Ingress
        }
    }

    /// `{prefix}-{workspaceID}`
    pub fn scoped(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.workspace_id)
    }

    /// Deployment and Service name of a member
    pub fn name(&self, member: Member) -> String {
        self.scoped(member.prefix())
    }

    pub fn service_account(&self, member: Member) -> String {
        self.name(member)
    }

    pub fn pvc_name(&self, member: Member) -> String {
        self.scoped(&format!("{}-pvc", member.prefix()))
    }

    pub fn image(&self, member: Member) -> String {
        self.images.get(member)
    }

    /// Version reported by the stack, taken from the application server tag
    pub fn version(&self) -> &str {
        self.images.tag(Member::Pfe)
    }

    /// Public host name of an exposed member
    pub fn host(&self, member: Member) -> String {
        format!("{}.{}", self.name(member), self.ingress_domain)
    }

    /// Public URL of an exposed member
    pub fn url(&self, member: Member, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.host(member))
    }

    /// Role granting access to this stack in the identity provider
    pub fn access_role(&self) -> String {
        self.scoped("codewind")
    }
}
