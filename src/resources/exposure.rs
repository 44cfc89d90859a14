//! Public exposure of the identity provider and the gatekeeper
//!
//! One generator covers both platforms: vanilla clusters get a TLS
//! terminated nginx Ingress, OpenShift gets a Route.

use crate::k8s::certs::IssuedCertificate;
use crate::k8s::objects::{ClusterObject, ResourceKind, route_api_resource};
use crate::resources::object_meta;
use crate::resources::secrets::tls_secret_name;
use crate::stack::{Instance, Member};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::api::DynamicObject;
use serde_json::json;
use std::collections::BTreeMap;

/// How exposed members are published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Ingress,
    Route,
}

impl Exposure {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Exposure::Ingress => ResourceKind::Ingress,
            Exposure::Route => ResourceKind::Route,
        }
    }
}

/// Where TLS ends for a member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// At the router or ingress controller; the pod speaks plain HTTP
    Edge,
    /// At the pod
    Passthrough,
}

impl Termination {
    pub fn for_member(member: Member) -> Self {
        match member {
            Member::Gatekeeper => Termination::Passthrough,
            _ => Termination::Edge,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Termination::Edge => "edge",
            Termination::Passthrough => "passthrough",
        }
    }
}

/// Generate the object publishing `member` at `instance.host(member)`
pub fn exposure(instance: &Instance, member: Member, cert: &IssuedCertificate) -> ClusterObject {
    match instance.exposure() {
        Exposure::Ingress => ClusterObject::Ingress(ingress(instance, member)),
        Exposure::Route => ClusterObject::Route(route(instance, member, cert)),
    }
}

fn ingress(instance: &Instance, member: Member) -> Ingress {
    let host = instance.host(member);

    let mut meta = object_meta(instance, member, instance.name(member));
    let mut annotations = BTreeMap::from([
        ("kubernetes.io/ingress.class".to_string(), "nginx".to_string()),
        (
            "nginx.ingress.kubernetes.io/force-ssl-redirect".to_string(),
            "true".to_string(),
        ),
    ]);
    if Termination::for_member(member) == Termination::Passthrough {
        annotations.insert(
            "nginx.ingress.kubernetes.io/backend-protocol".to_string(),
            "HTTPS".to_string(),
        );
    }
    meta.annotations = Some(annotations);

    Ingress {
        metadata: meta,
        spec: Some(IngressSpec {
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(tls_secret_name(instance, member)),
            }]),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: instance.name(member),
                                port: Some(ServiceBackendPort {
                                    number: Some(member.port()),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn route(instance: &Instance, member: Member, cert: &IssuedCertificate) -> DynamicObject {
    let termination = Termination::for_member(member);
    let tls = match termination {
        Termination::Edge => json!({
            "termination": termination.as_str(),
            "insecureEdgeTerminationPolicy": "Redirect",
            "certificate": cert.cert_pem,
            "key": cert.key_pem,
        }),
        Termination::Passthrough => json!({
            "termination": termination.as_str(),
            "insecureEdgeTerminationPolicy": "Redirect",
        }),
    };

    let mut route = DynamicObject::new(&instance.name(member), &route_api_resource());
    route.metadata = object_meta(instance, member, instance.name(member));
    route.data = json!({
        "spec": {
            "host": instance.host(member),
            "port": { "targetPort": member.short() },
            "tls": tls,
            "to": {
                "kind": "Service",
                "name": instance.name(member),
                "weight": 100,
            },
        }
    });
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::instance;
    use crate::stack::WORKSPACE_LABEL;

    fn cert() -> IssuedCertificate {
        IssuedCertificate {
            key_pem: "KEY".to_string(),
            cert_pem: "CERT".to_string(),
        }
    }

    #[test]
    fn test_platform_selects_exposure() {
        let vanilla = exposure(&instance(false), Member::Keycloak, &cert());
        assert_eq!(vanilla.kind(), ResourceKind::Ingress);

        let openshift = exposure(&instance(true), Member::Keycloak, &cert());
        assert_eq!(openshift.kind(), ResourceKind::Route);
    }

    #[test]
    fn test_ingress_tls_and_backend() {
        let obj = exposure(&instance(false), Member::Gatekeeper, &cert());
        let ClusterObject::Ingress(ingress) = &obj else {
            panic!("expected an ingress");
        };

        let annotations = ingress.metadata.annotations.as_ref().unwrap();
        assert_eq!(annotations.get("kubernetes.io/ingress.class").unwrap(), "nginx");
        assert_eq!(
            annotations.get("nginx.ingress.kubernetes.io/backend-protocol").unwrap(),
            "HTTPS"
        );

        let spec = ingress.spec.as_ref().unwrap();
        let tls = &spec.tls.as_ref().unwrap()[0];
        assert_eq!(tls.secret_name.as_deref(), Some("secret-codewind-tls-k3x9az"));
        assert_eq!(
            tls.hosts.as_ref().unwrap()[0],
            "codewind-gatekeeper-k3x9az.10.0.0.1.nip.io"
        );

        let rule = &spec.rules.as_ref().unwrap()[0];
        let backend = rule.http.as_ref().unwrap().paths[0].backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "codewind-gatekeeper-k3x9az");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(9096));
        assert_eq!(obj.label(WORKSPACE_LABEL), Some("k3x9az"));
    }

    #[test]
    fn test_keycloak_ingress_speaks_http_to_backend() {
        let obj = exposure(&instance(false), Member::Keycloak, &cert());
        let ClusterObject::Ingress(ingress) = obj else {
            panic!("expected an ingress");
        };
        let annotations = ingress.metadata.annotations.unwrap();
        assert!(!annotations.contains_key("nginx.ingress.kubernetes.io/backend-protocol"));
    }

    #[test]
    fn test_route_termination_per_member() {
        let keycloak = exposure(&instance(true), Member::Keycloak, &cert());
        let ClusterObject::Route(route) = &keycloak else {
            panic!("expected a route");
        };
        assert_eq!(route.data["spec"]["tls"]["termination"], "edge");
        assert_eq!(route.data["spec"]["tls"]["certificate"], "CERT");
        assert_eq!(route.data["spec"]["to"]["name"], "codewind-keycloak-k3x9az");
        assert_eq!(route.types.as_ref().unwrap().api_version, "route.openshift.io/v1");
        assert_eq!(keycloak.label(WORKSPACE_LABEL), Some("k3x9az"));

        let gatekeeper = exposure(&instance(true), Member::Gatekeeper, &cert());
        let ClusterObject::Route(route) = &gatekeeper else {
            panic!("expected a route");
        };
        assert_eq!(route.data["spec"]["tls"]["termination"], "passthrough");
        assert!(route.data["spec"]["tls"].get("key").is_none());
    }
}
