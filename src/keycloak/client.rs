//! Keycloak admin API client

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

const TOKEN_PATH: &str = "/auth/realms/master/protocol/openid-connect/token";
const ADMIN_PATH: &str = "/auth/admin/realms";
const ADMIN_CLI: &str = "admin-cli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Missing(String),
}

impl AdminError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AdminError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    pub realm: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub public_client: bool,
    #[serde(default)]
    pub standard_flow_enabled: bool,
    #[serde(default)]
    pub direct_access_grants_enabled: bool,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Credential<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
    temporary: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    value: Option<String>,
}

/// Calls against the Keycloak admin API used by the bootstrap sequence.
///
/// `token` is the bearer token returned by [`IdentityAdmin::login`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Log in to the master realm and return an access token
    async fn login(&self, user: &str, password: &str) -> AdminResult<String>;

    async fn get_realm(&self, token: &str, realm: &str) -> AdminResult<Option<RealmRepresentation>>;

    async fn create_realm(&self, token: &str, realm: &RealmRepresentation) -> AdminResult<()>;

    async fn get_client(
        &self,
        token: &str,
        realm: &str,
        client_id: &str,
    ) -> AdminResult<Option<ClientRepresentation>>;

    async fn create_client(
        &self,
        token: &str,
        realm: &str,
        client: &ClientRepresentation,
    ) -> AdminResult<()>;

    async fn update_client(
        &self,
        token: &str,
        realm: &str,
        client: &ClientRepresentation,
    ) -> AdminResult<()>;

    async fn create_role(&self, token: &str, realm: &str, role: &str) -> AdminResult<()>;

    async fn get_user(
        &self,
        token: &str,
        realm: &str,
        username: &str,
    ) -> AdminResult<Option<UserRepresentation>>;

    async fn create_user(&self, token: &str, realm: &str, user: &UserRepresentation)
    -> AdminResult<()>;

    async fn set_password(
        &self,
        token: &str,
        realm: &str,
        user_id: &str,
        password: &str,
    ) -> AdminResult<()>;

    /// Add a realm role to a user's role mappings
    async fn grant_role(&self, token: &str, realm: &str, user_id: &str, role: &str)
    -> AdminResult<()>;

    /// Secret of a confidential client, looked up by its internal id
    async fn client_secret(&self, token: &str, realm: &str, id: &str) -> AdminResult<String>;
}

/// [`IdentityAdmin`] over HTTP
pub struct KeycloakClient {
    http: reqwest::Client,
    base_url: String,
}

impl KeycloakClient {
    /// Client for the Keycloak at `base_url` (e.g. `https://codewind-keycloak-abc.1.2.3.4.nip.io`).
    ///
    /// Exposed endpoints carry self-signed certificates, so certificate
    /// verification is disabled when `accept_invalid_certs` is set.
    pub fn new(base_url: &str, accept_invalid_certs: bool) -> AdminResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| AdminError::Http {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, ADMIN_PATH, path)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> AdminResult<Response> {
        tracing::debug!(method, url, "keycloak request");
        let response = request.send().await.map_err(|source| AdminError::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AdminError::Status {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(url: &str, response: Response) -> AdminResult<T> {
        response.json().await.map_err(|source| AdminError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// GET returning None on 404
    async fn get_optional<T: DeserializeOwned>(&self, token: &str, url: &str) -> AdminResult<Option<T>> {
        match self.send("GET", url, self.http.get(url).bearer_auth(token)).await {
            Ok(response) => Ok(Some(Self::json(url, response).await?)),
            Err(AdminError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// GET a search endpoint, returning its first match
    async fn get_first<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> AdminResult<Option<T>> {
        let request = self.http.get(url).bearer_auth(token).query(query);
        let response = self.send("GET", url, request).await?;
        let mut items: Vec<T> = Self::json(url, response).await?;
        Ok(if items.is_empty() { None } else { Some(items.swap_remove(0)) })
    }

    async fn post<B: Serialize + Sync + ?Sized>(&self, token: &str, url: &str, body: &B) -> AdminResult<()> {
        self.send("POST", url, self.http.post(url).bearer_auth(token).json(body))
            .await
            .map(|_| ())
    }

    async fn put<B: Serialize + Sync + ?Sized>(&self, token: &str, url: &str, body: &B) -> AdminResult<()> {
        self.send("PUT", url, self.http.put(url).bearer_auth(token).json(body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl IdentityAdmin for KeycloakClient {
    async fn login(&self, user: &str, password: &str) -> AdminResult<String> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let form = [
            ("grant_type", "password"),
            ("client_id", ADMIN_CLI),
            ("username", user),
            ("password", password),
        ];
        let response = self.send("POST", &url, self.http.post(&url).form(&form)).await?;
        let token: TokenResponse = Self::json(&url, response).await?;
        Ok(token.access_token)
    }

    async fn get_realm(&self, token: &str, realm: &str) -> AdminResult<Option<RealmRepresentation>> {
        self.get_optional(token, &self.admin_url(&format!("/{}", realm))).await
    }

    async fn create_realm(&self, token: &str, realm: &RealmRepresentation) -> AdminResult<()> {
        self.post(token, &self.admin_url(""), realm).await
    }

    async fn get_client(
        &self,
        token: &str,
        realm: &str,
        client_id: &str,
    ) -> AdminResult<Option<ClientRepresentation>> {
        let url = self.admin_url(&format!("/{}/clients", realm));
        self.get_first(token, &url, &[("clientId", client_id)]).await
    }

    async fn create_client(
        &self,
        token: &str,
        realm: &str,
        client: &ClientRepresentation,
    ) -> AdminResult<()> {
        self.post(token, &self.admin_url(&format!("/{}/clients", realm)), client).await
    }

    async fn update_client(
        &self,
        token: &str,
        realm: &str,
        client: &ClientRepresentation,
    ) -> AdminResult<()> {
        let id = client
            .id
            .as_deref()
            .ok_or_else(|| AdminError::Missing(format!("client '{}' has no id", client.client_id)))?;
        let url = self.admin_url(&format!("/{}/clients/{}", realm, id));
        self.put(token, &url, client).await
    }

    async fn create_role(&self, token: &str, realm: &str, role: &str) -> AdminResult<()> {
        let body = RoleRepresentation {
            id: None,
            name: role.to_string(),
        };
        self.post(token, &self.admin_url(&format!("/{}/roles", realm)), &body).await
    }

    async fn get_user(
        &self,
        token: &str,
        realm: &str,
        username: &str,
    ) -> AdminResult<Option<UserRepresentation>> {
        let url = self.admin_url(&format!("/{}/users", realm));
        self.get_first(token, &url, &[("username", username), ("exact", "true")])
            .await
    }

    async fn create_user(
        &self,
        token: &str,
        realm: &str,
        user: &UserRepresentation,
    ) -> AdminResult<()> {
        self.post(token, &self.admin_url(&format!("/{}/users", realm)), user).await
    }

    async fn set_password(
        &self,
        token: &str,
        realm: &str,
        user_id: &str,
        password: &str,
    ) -> AdminResult<()> {
        let url = self.admin_url(&format!("/{}/users/{}/reset-password", realm, user_id));
        let credential = Credential {
            kind: "password",
            value: password,
            temporary: false,
        };
        self.put(token, &url, &credential).await
    }

    async fn grant_role(
        &self,
        token: &str,
        realm: &str,
        user_id: &str,
        role: &str,
    ) -> AdminResult<()> {
        let role_url = self.admin_url(&format!("/{}/roles/{}", realm, role));
        let representation: RoleRepresentation = self
            .get_optional(token, &role_url)
            .await?
            .ok_or_else(|| AdminError::Missing(format!("role '{}' not found in realm '{}'", role, realm)))?;

        let url = self.admin_url(&format!("/{}/users/{}/role-mappings/realm", realm, user_id));
        self.post(token, &url, &[representation]).await
    }

    async fn client_secret(&self, token: &str, realm: &str, id: &str) -> AdminResult<String> {
        let url = self.admin_url(&format!("/{}/clients/{}/client-secret", realm, id));
        let response = self.send("GET", &url, self.http.get(&url).bearer_auth(token)).await?;
        let secret: SecretResponse = Self::json(&url, response).await?;
        secret
            .value
            .ok_or_else(|| AdminError::Missing(format!("client {} has no secret", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with a JSON body, yielding the request line
    async fn serve_once(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                if n == 0 {
                    break;
                }
                read += n;
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..read]).to_string();
            request.lines().next().unwrap_or_default().to_string()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn test_get_user_encodes_username() {
        let (base, request) = serve_once("[]").await;
        let client = KeycloakClient::new(&base, false).unwrap();

        let user = client
            .get_user("token", "codewind", "dev+ops&x@example.com")
            .await
            .unwrap();
        assert!(user.is_none());

        let line = request.await.unwrap();
        assert!(
            line.contains("/auth/admin/realms/codewind/users?username=dev%2Bops%26x%40example.com&exact=true"),
            "{}",
            line
        );
    }

    #[tokio::test]
    async fn test_get_client_encodes_client_id() {
        let (base, request) = serve_once(r#"[{"id":"42","clientId":"web#client"}]"#).await;
        let client = KeycloakClient::new(&base, false).unwrap();

        let found = client
            .get_client("token", "codewind", "web#client")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("42"));
        assert_eq!(found.client_id, "web#client");

        let line = request.await.unwrap();
        assert!(line.contains("/clients?clientId=web%23client "), "{}", line);
    }

    #[test]
    fn test_admin_url() {
        let client = KeycloakClient::new("https://kc.example.com/", true).unwrap();
        assert_eq!(
            client.admin_url("/codewind/clients"),
            "https://kc.example.com/auth/admin/realms/codewind/clients"
        );
    }

    #[test]
    fn test_client_representation_wire_format() {
        let client = ClientRepresentation {
            id: None,
            client_id: "codewind".to_string(),
            enabled: true,
            public_client: false,
            standard_flow_enabled: true,
            direct_access_grants_enabled: true,
            redirect_uris: vec!["https://gk.example.com/*".to_string()],
        };
        let json = serde_json::to_value(&client).unwrap();
        assert_eq!(json["clientId"], "codewind");
        assert_eq!(json["redirectUris"][0], "https://gk.example.com/*");
        assert!(json.get("id").is_none());

        let parsed: ClientRepresentation =
            serde_json::from_str(r#"{"id":"42","clientId":"codewind"}"#).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("42"));
        assert!(parsed.redirect_uris.is_empty());
    }

    #[test]
    fn test_status_error() {
        let err = AdminError::Status {
            method: "POST",
            url: "https://kc/token".to_string(),
            status: 401,
            body: "invalid_grant".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "POST https://kc/token returned 401: invalid_grant");
        assert_eq!(AdminError::Missing("x".to_string()).status(), None);
    }
}
