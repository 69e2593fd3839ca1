//! Org / workspace / connection model
//!
//! Discovery responses come back in loosely-typed shapes. Everything here
//! works on already-decoded `serde_json::Value` collections and turns them
//! into the few typed records the CLI needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::numbers::extract::{first_field, value_to_string, CONNECTION_ID_FIELDS};

/// Provider assumed when a connection does not name one
pub const DEFAULT_PROVIDER: &str = "exotel";

/// Field order used to pick an org's display name
const ORG_DISPLAY_FIELDS: &[&str] = &["name", "display_name", "domain", "id", "org_id", "orgId"];

/// Fields compared exactly (case-insensitive) when resolving an org
const ORG_EXACT_FIELDS: &[&str] = &[
    "name",
    "display_name",
    "domain",
    "org_domain",
    "id",
    "org_id",
    "orgId",
];

/// Fields compared by substring when no exact match exists
const ORG_PARTIAL_FIELDS: &[&str] = &["name", "display_name", "domain", "org_domain"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub channel_provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// Workspaces of one org plus their connections, keyed by workspace id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgData {
    pub workspaces: Vec<Workspace>,
    pub connections: BTreeMap<String, Vec<Connection>>,
}

/// One selectable (workspace, connection) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderEntry {
    /// `"{workspace} - {connection}"`
    pub name: String,
    pub connection: String,
    pub workspace_id: String,
    pub workspace_name: String,
    pub provider_name: String,
}

/// Non-empty trimmed string form of a field
fn field_text(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .map(value_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn lowered(item: &Value, key: &str) -> String {
    field_text(item, key).unwrap_or_default().to_lowercase()
}

/// Turn a raw connections collection into records with a usable id.
///
/// Plain strings become `{id, name: id}`. Objects take the id from the
/// first truthy of `id`, `connection_id`, `connectionId`, falling back to
/// `name`. Entries whose id is blank after trimming are dropped.
pub fn normalize_connections(raw: &[Value]) -> Vec<Connection> {
    let mut connections = Vec::with_capacity(raw.len());
    for item in raw {
        match item {
            Value::String(s) => {
                let id = s.trim();
                if id.is_empty() {
                    warn!("Skipping empty connection string");
                    continue;
                }
                connections.push(Connection {
                    id: id.to_string(),
                    name: id.to_string(),
                    channel_provider: DEFAULT_PROVIDER.to_string(),
                });
            }
            Value::Object(_) => {
                let id = first_field(item, CONNECTION_ID_FIELDS)
                    .or_else(|| first_field(item, &["name"]))
                    .map(|v| value_to_string(v).trim().to_string())
                    .unwrap_or_default();
                if id.is_empty() {
                    warn!("Skipping connection without a usable id: {}", item);
                    continue;
                }
                let name = field_text(item, "name").unwrap_or_else(|| id.clone());
                let channel_provider = field_text(item, "channel_provider")
                    .or_else(|| field_text(item, "provider"))
                    .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
                connections.push(Connection {
                    id,
                    name,
                    channel_provider,
                });
            }
            other => warn!("Skipping unexpected connection entry: {}", other),
        }
    }
    connections
}

/// Typed workspace from a discovery item; non-objects and id-less entries are skipped
pub fn workspace_from_value(item: &Value) -> Option<Workspace> {
    if !item.is_object() {
        warn!("Skipping invalid workspace entry: {}", item);
        return None;
    }
    let id = field_text(item, "id").or_else(|| field_text(item, "workspace_id"))?;
    let name = field_text(item, "name").unwrap_or_else(|| id.clone());
    Some(Workspace { id, name })
}

/// Sorted display names of every org that has one
pub fn org_display_names(orgs: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = orgs
        .iter()
        .filter_map(|org| {
            ORG_DISPLAY_FIELDS
                .iter()
                .find_map(|field| field_text(org, field))
        })
        .collect();
    names.sort();
    names
}

/// Identifier to use in API paths for a matched org
fn org_api_id(org: &Value) -> Option<String> {
    if let Some(id) = field_text(org, "org_id").or_else(|| field_text(org, "orgId")) {
        return Some(id);
    }
    let domain = field_text(org, "domain");
    if let Some(id) = field_text(org, "id") {
        if Some(&id) != domain.as_ref() {
            return Some(id);
        }
    }
    field_text(org, "org_domain").or(domain)
}

/// Resolve an org name, domain or id to the id used in API paths.
///
/// Exact case-insensitive matches win over substring matches. Returns
/// `None` when nothing matches or the matched org carries no id.
pub fn find_org_id(orgs: &[Value], name: &str) -> Option<String> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let exact = orgs.iter().find(|org| {
        ORG_EXACT_FIELDS
            .iter()
            .any(|field| lowered(org, field) == needle)
    });
    let matched = exact.or_else(|| {
        orgs.iter().find(|org| {
            ORG_PARTIAL_FIELDS.iter().any(|field| {
                let value = lowered(org, field);
                !value.is_empty() && value.contains(&needle)
            })
        })
    })?;

    let id = org_api_id(matched);
    debug!("Resolved org '{}' to {:?}", name, id);
    id
}

/// Flatten org data into selectable entries. Workspaces without
/// connections are left out.
pub fn list_providers(data: &OrgData) -> Vec<ProviderEntry> {
    let mut entries = Vec::new();
    for workspace in &data.workspaces {
        let Some(connections) = data.connections.get(&workspace.id) else {
            continue;
        };
        for connection in connections {
            entries.push(ProviderEntry {
                name: format!("{} - {}", workspace.name, connection.name),
                connection: connection.id.clone(),
                workspace_id: workspace.id.clone(),
                workspace_name: workspace.name.clone(),
                provider_name: connection.channel_provider.clone(),
            });
        }
    }
    entries
}

/// Workspace owning `connection_id`, if any
pub fn locate_connection<'a>(
    data: &'a OrgData,
    connection_id: &str,
) -> Option<(&'a Workspace, &'a Connection)> {
    data.workspaces.iter().find_map(|workspace| {
        data.connections
            .get(&workspace.id)?
            .iter()
            .find(|c| c.id == connection_id)
            .map(|c| (workspace, c))
    })
}

/// Phone-numbers collection URL for one connection
pub fn build_phone_numbers_url(
    base_url: &str,
    org_id: &str,
    workspace_id: &str,
    provider: &str,
    connection_id: &str,
) -> String {
    format!(
        "{}/api/app-authoring/orgs/{}/workspaces/{}/channels/v2v/providers/{}/connections/{}/phone-numbers",
        base_url.trim_end_matches('/'),
        org_id,
        workspace_id,
        provider,
        connection_id
    )
}
