//! Container image selection from environment overrides

use crate::stack::Member;
use std::collections::HashMap;

/// Tag used when no `_TAG` override is set
pub const DEFAULT_TAG: &str = "latest";

/// Resolved image references for every stack member
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    images: HashMap<Member, (String, String)>,
}

impl ImageSet {
    /// Resolve images from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve images using `lookup` for the `<MEMBER>_IMAGE` and `<MEMBER>_TAG` variables
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let images = Member::ALL
            .iter()
            .map(|member| {
                let name = lookup(member.image_env())
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| member.default_image().to_string());
                let tag = lookup(member.tag_env())
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TAG.to_string());
                (*member, (name, tag))
            })
            .collect();

        Self { images }
    }

    /// Full `name:tag` reference for a member
    pub fn get(&self, member: Member) -> String {
        let (name, tag) = &self.images[&member];
        format!("{}:{}", name, tag)
    }

    pub fn tag(&self, member: Member) -> &str {
        &self.images[&member].1
    }

    /// List all images in member order
    pub fn list(&self) -> Vec<(Member, String)> {
        Member::ALL.iter().map(|m| (*m, self.get(*m))).collect()
    }
}

impl Default for ImageSet {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let images = ImageSet::default();
        assert_eq!(
            images.get(Member::Pfe),
            "eclipse/codewind-pfe-amd64:latest"
        );
        assert_eq!(images.tag(Member::Gatekeeper), "latest");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("KEYCLOAK_IMAGE", "quay.io/me/keycloak"),
            ("KEYCLOAK_TAG", "0.9.0"),
            ("PFE_TAG", "0.9.0"),
            ("GATEKEEPER_IMAGE", "  "),
        ]);
        let images = ImageSet::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(images.get(Member::Keycloak), "quay.io/me/keycloak:0.9.0");
        assert_eq!(images.get(Member::Pfe), "eclipse/codewind-pfe-amd64:0.9.0");
        assert_eq!(
            images.get(Member::Gatekeeper),
            "eclipse/codewind-gatekeeper-amd64:latest"
        );
    }

    #[test]
    fn test_list_order() {
        let members: Vec<Member> = ImageSet::default().list().into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, Member::ALL.to_vec());
    }
}
