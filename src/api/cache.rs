//! Discovery cache
//!
//! Admin tokens, org lists and per-org workspace data are slow to fetch and
//! rarely change within one run. Entries are keyed by environment so that
//! switching deployments never serves another deployment's data.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::directory::OrgData;

#[derive(Debug, Default)]
pub struct DiscoveryCache {
    tokens: HashMap<String, String>,
    orgs: HashMap<String, Vec<Value>>,
    org_data: HashMap<(String, String), OrgData>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self, env: &str) -> Option<&str> {
        self.tokens.get(env).map(String::as_str)
    }

    pub fn set_token(&mut self, env: &str, token: String) {
        self.tokens.insert(env.to_string(), token);
    }

    pub fn orgs(&self, env: &str) -> Option<&[Value]> {
        self.orgs.get(env).map(Vec::as_slice)
    }

    pub fn set_orgs(&mut self, env: &str, orgs: Vec<Value>) {
        self.orgs.insert(env.to_string(), orgs);
    }

    pub fn org_data(&self, env: &str, org_id: &str) -> Option<&OrgData> {
        self.org_data.get(&(env.to_string(), org_id.to_string()))
    }

    pub fn set_org_data(&mut self, env: &str, org_id: &str, data: OrgData) {
        self.org_data
            .insert((env.to_string(), org_id.to_string()), data);
    }

    /// Drop everything cached for `env`, leaving other environments intact
    pub fn clear(&mut self, env: &str) {
        self.tokens.remove(env);
        self.orgs.remove(env);
        self.org_data.retain(|(cached_env, _), _| cached_env != env);
        debug!("Cleared discovery cache for environment '{}'", env);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.orgs.is_empty() && self.org_data.is_empty()
    }
}
