//! Admin session and discovery calls
//!
//! Multi-org mode logs in once per environment with the admin credentials
//! from config, then walks orgs -> workspaces -> connections. Results are
//! memoized in a [`DiscoveryCache`] owned by the caller.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::cache::DiscoveryCache;
use super::directory::{
    build_phone_numbers_url, find_org_id, list_providers, locate_connection,
    normalize_connections, workspace_from_value, Connection, OrgData, ProviderEntry, Workspace,
    DEFAULT_PROVIDER,
};
use super::error::ApiError;
use super::http::{mask_token, ApiHttpClient};
use crate::config::EnvironmentConfig;
use crate::numbers::normalize::collection_items;

pub const LOGIN_PATH: &str = "/api/auth/login";

fn join(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Exchange admin credentials for a bearer token
pub fn login(http: &ApiHttpClient, env: &EnvironmentConfig) -> Result<String, ApiError> {
    let url = join(&env.url, LOGIN_PATH);
    info!("Logging in to {} for org_id: {}", url, env.org_id);
    let payload = json!({
        "user_id": env.user_id,
        "password": env.password,
        "org_id": env.org_id,
    });

    let body = http
        .post_json(&url, None, &payload)?
        .error_for_status()?
        .json()?;
    let token = body
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Authentication {
            body: "login response did not include an access_token".to_string(),
        })?;
    debug!("Login succeeded, token {}", mask_token(token));
    Ok(token.to_string())
}

/// GET a discovery collection
fn get_collection(http: &ApiHttpClient, url: &str, token: &str) -> Result<Vec<Value>, ApiError> {
    let body = http.get(url, Some(token), &[])?.error_for_status()?.json()?;
    Ok(collection_items(&body))
}

pub fn get_orgs(http: &ApiHttpClient, base_url: &str, token: &str) -> Result<Vec<Value>, ApiError> {
    let url = join(base_url, "/api/org/orgs");
    let orgs = get_collection(http, &url, token)?;
    info!("Fetched {} organizations", orgs.len());
    Ok(orgs)
}

pub fn get_workspaces(
    http: &ApiHttpClient,
    base_url: &str,
    token: &str,
    org_id: &str,
) -> Result<Vec<Workspace>, ApiError> {
    let url = join(base_url, &format!("/api/org/orgs/{org_id}/workspaces"));
    let workspaces: Vec<Workspace> = get_collection(http, &url, token)?
        .iter()
        .filter_map(workspace_from_value)
        .collect();
    info!("Fetched {} workspaces for org {}", workspaces.len(), org_id);
    Ok(workspaces)
}

/// Connections of one workspace. A 404 means the workspace has none.
pub fn get_connections(
    http: &ApiHttpClient,
    base_url: &str,
    token: &str,
    org_id: &str,
    workspace_id: &str,
) -> Result<Vec<Connection>, ApiError> {
    let url = join(
        base_url,
        &format!("/api/app-authoring/orgs/{org_id}/workspaces/{workspace_id}/connections"),
    );
    match get_collection(http, &url, token) {
        Ok(raw) => {
            let connections = normalize_connections(&raw);
            debug!(
                "Fetched {} connections for workspace {}",
                connections.len(),
                workspace_id
            );
            Ok(connections)
        }
        Err(ApiError::NotFound { .. }) => {
            debug!("No connections endpoint for workspace {}", workspace_id);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Workspaces of an org with their connections.
///
/// A workspace whose connections cannot be listed is kept with none.
pub fn fetch_org_data(
    http: &ApiHttpClient,
    base_url: &str,
    token: &str,
    org_id: &str,
) -> Result<OrgData, ApiError> {
    let workspaces = get_workspaces(http, base_url, token, org_id)?;
    let mut data = OrgData::default();
    for workspace in &workspaces {
        let connections = get_connections(http, base_url, token, org_id, &workspace.id)
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to fetch connections for workspace {}: {}",
                    workspace.id, e
                );
                Vec::new()
            });
        data.connections.insert(workspace.id.clone(), connections);
    }
    data.workspaces = workspaces;
    Ok(data)
}

/// Admin view of one environment
pub struct AdminSession<'a> {
    http: &'a ApiHttpClient,
    env_name: String,
    env: &'a EnvironmentConfig,
    cache: &'a mut DiscoveryCache,
}

impl<'a> AdminSession<'a> {
    pub fn new(
        http: &'a ApiHttpClient,
        env_name: &str,
        env: &'a EnvironmentConfig,
        cache: &'a mut DiscoveryCache,
    ) -> Self {
        Self {
            http,
            env_name: env_name.to_string(),
            env,
            cache,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.env.url
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Cached admin token, logging in on first use
    pub fn token(&mut self) -> Result<String, ApiError> {
        if let Some(token) = self.cache.token(&self.env_name) {
            return Ok(token.to_string());
        }
        let token = login(self.http, self.env)?;
        self.cache.set_token(&self.env_name, token.clone());
        Ok(token)
    }

    pub fn orgs(&mut self) -> Result<Vec<Value>, ApiError> {
        if let Some(orgs) = self.cache.orgs(&self.env_name) {
            return Ok(orgs.to_vec());
        }
        let token = self.token()?;
        let orgs = get_orgs(self.http, &self.env.url, &token)?;
        self.cache.set_orgs(&self.env_name, orgs.clone());
        Ok(orgs)
    }

    pub fn org_data(&mut self, org_id: &str) -> Result<OrgData, ApiError> {
        if let Some(data) = self.cache.org_data(&self.env_name, org_id) {
            return Ok(data.clone());
        }
        let token = self.token()?;
        let data = fetch_org_data(self.http, &self.env.url, &token, org_id)?;
        self.cache
            .set_org_data(&self.env_name, org_id, data.clone());
        Ok(data)
    }

    /// Resolve a name, domain or id to the org id used in API paths
    pub fn resolve_org(&mut self, name: &str) -> Result<Option<String>, ApiError> {
        let orgs = self.orgs()?;
        let org_id = find_org_id(&orgs, name);
        if let Some(ref id) = org_id {
            if id.eq_ignore_ascii_case(&self.env.org_id)
                && !name.trim().eq_ignore_ascii_case(&self.env.org_id)
            {
                warn!(
                    "Organization '{}' resolved to the admin org '{}'; verify the name",
                    name, id
                );
            }
        }
        Ok(org_id)
    }

    pub fn providers(&mut self, org_id: &str) -> Result<Vec<ProviderEntry>, ApiError> {
        Ok(list_providers(&self.org_data(org_id)?))
    }

    /// Phone-numbers URL for a connection.
    ///
    /// Without an explicit workspace, the workspace that owns the
    /// connection is used (adopting its provider), else the first
    /// workspace. `None` when the org has no workspaces at all.
    pub fn phone_numbers_url(
        &mut self,
        org_id: &str,
        connection_id: &str,
        workspace_id: Option<&str>,
        provider: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        let (workspace_id, located_provider) = match workspace_id {
            Some(ws) => (ws.to_string(), None),
            None => {
                let data = self.org_data(org_id)?;
                match locate_connection(&data, connection_id) {
                    Some((ws, conn)) => (ws.id.clone(), Some(conn.channel_provider.clone())),
                    None => match data.workspaces.first() {
                        Some(ws) => {
                            warn!(
                                "Connection {} not found in any workspace, using {}",
                                connection_id, ws.id
                            );
                            (ws.id.clone(), None)
                        }
                        None => return Ok(None),
                    },
                }
            }
        };
        let provider = provider
            .map(str::to_string)
            .or(located_provider)
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());

        Ok(Some(build_phone_numbers_url(
            &self.env.url,
            org_id,
            &workspace_id,
            &provider,
            connection_id,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn http() -> ApiHttpClient {
        ApiHttpClient::new(Duration::from_secs(5)).expect("client")
    }

    fn env_for(server: &MockServer) -> EnvironmentConfig {
        EnvironmentConfig {
            url: server.base_url(),
            user_id: "admin".into(),
            password: "pw".into(),
            org_id: "admin-org".into(),
        }
    }

    fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .json_body(json!({"user_id": "admin", "password": "pw", "org_id": "admin-org"}));
            then.status(200).json_body(json!({"access_token": "adm-token"}));
        })
    }

    #[test]
    fn test_login_returns_access_token() {
        let server = MockServer::start();
        let mock = mock_login(&server);
        let token = login(&http(), &env_for(&server)).expect("token");
        mock.assert();
        assert_eq!(token, "adm-token");
    }

    #[test]
    fn test_login_without_token_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(200).json_body(json!({"ok": true}));
        });
        let err = login(&http(), &env_for(&server)).expect_err("no token");
        assert!(matches!(err, ApiError::Authentication { .. }));
    }

    #[test]
    fn test_connections_404_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/app-authoring/orgs/o1/workspaces/w1/connections");
            then.status(404);
        });
        let connections =
            get_connections(&http(), &server.base_url(), "t", "o1", "w1").expect("empty");
        assert!(connections.is_empty());
    }

    #[test]
    fn test_session_caches_discovery() {
        let server = MockServer::start();
        let login_mock = mock_login(&server);
        let orgs_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/org/orgs")
                .header("authorization", "Bearer adm-token");
            then.status(200)
                .json_body(json!({"items": [{"name": "Acme", "org_id": "acme"}]}));
        });
        let ws_mock = server.mock(|when, then| {
            when.method(GET).path("/api/org/orgs/acme/workspaces");
            then.status(200)
                .json_body(json!([{"id": "w1", "name": "Sales"}, {"id": "w2", "name": "Ops"}]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/app-authoring/orgs/acme/workspaces/w1/connections");
            then.status(200)
                .json_body(json!(["c1", {"connection_id": "c2", "provider": "tata"}]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/app-authoring/orgs/acme/workspaces/w2/connections");
            then.status(500).body("boom");
        });

        let http = http();
        let env = env_for(&server);
        let mut cache = DiscoveryCache::new();
        let mut session = AdminSession::new(&http, "prod", &env, &mut cache);

        let org_id = session.resolve_org("acme").expect("orgs").expect("match");
        assert_eq!(org_id, "acme");
        let providers = session.providers(&org_id).expect("providers");
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[1].name, "Sales - c2");
        assert_eq!(providers[1].provider_name, "tata");

        let url = session
            .phone_numbers_url(&org_id, "c2", None, None)
            .expect("discovery")
            .expect("workspace");
        assert!(url.ends_with(
            "/api/app-authoring/orgs/acme/workspaces/w1/channels/v2v/providers/tata/connections/c2/phone-numbers"
        ));

        // second round is served from cache
        session.resolve_org("Acme").expect("orgs");
        session.providers(&org_id).expect("providers");
        login_mock.assert_hits(1);
        orgs_mock.assert_hits(1);
        ws_mock.assert_hits(1);

        assert!(!cache.is_empty());
        cache.clear("prod");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_phone_numbers_url_without_workspaces() {
        let server = MockServer::start();
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/org/orgs/o1/workspaces");
            then.status(200).json_body(json!({"items": []}));
        });

        let http = http();
        let env = env_for(&server);
        let mut cache = DiscoveryCache::new();
        let mut session = AdminSession::new(&http, "prod", &env, &mut cache);
        assert_eq!(
            session
                .phone_numbers_url("o1", "c1", None, None)
                .expect("discovery"),
            None
        );
        assert_eq!(
            session
                .phone_numbers_url("o1", "c1", Some("w9"), Some("plivo"))
                .expect("explicit")
                .as_deref()
                .map(|u| u.ends_with("/workspaces/w9/channels/v2v/providers/plivo/connections/c1/phone-numbers")),
            Some(true)
        );
    }
}
