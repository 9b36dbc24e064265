//! HTTP clients for the registry and store services.
//!
//! ```ignore
//! let registry = HttpModuleRegistry::new("https://portal.example/api/", Duration::from_secs(10))?;
//! let modules = registry.fetch_modules(Role::Clinic).await?;
//! ```

use crate::{ModuleRegistry, PermissionStore};
use async_trait::async_trait;
use gatekeep_core::error::{GatekeepError, GatekeepResult};
use gatekeep_core::{ModuleDescriptor, ModulePermission, PermissionGrant, Role};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Parses a service base URL. The path is treated as a directory.
fn parse_base(base_url: &str) -> GatekeepResult<Url> {
    if base_url.trim().is_empty() {
        return Err(GatekeepError::InvalidInput("base URL must not be empty".into()));
    }
    let url = Url::parse(base_url)
        .map_err(|e| GatekeepError::InvalidInput(format!("invalid base URL {base_url:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(GatekeepError::InvalidInput(format!(
            "{base_url:?} cannot be used as a base URL"
        )));
    }
    Ok(url)
}

/// Appends path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> GatekeepResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GatekeepError::Internal(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn build_client(timeout: Duration) -> GatekeepResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatekeepError::Internal(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// `GET {base}/modules?role=<role>` returning a JSON array of descriptors.
pub struct HttpModuleRegistry {
    client: reqwest::Client,
    base: Url,
}

impl HttpModuleRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> GatekeepResult<Self> {
        let base = parse_base(base_url)?;
        tracing::info!(base = %base, "module registry client ready");
        Ok(Self {
            client: build_client(timeout)?,
            base,
        })
    }
}

/// Decodes a registry response body.
pub fn decode_modules(status: u16, body: &str) -> GatekeepResult<Vec<ModuleDescriptor>> {
    if !(200..300).contains(&status) {
        return Err(GatekeepError::RegistryUnavailable(format!("HTTP {status}")));
    }
    serde_json::from_str(body)
        .map_err(|e| GatekeepError::RegistryUnavailable(format!("malformed module list: {e}")))
}

#[async_trait]
impl ModuleRegistry for HttpModuleRegistry {
    async fn fetch_modules(&self, role: Role) -> GatekeepResult<Vec<ModuleDescriptor>> {
        let mut url = endpoint(&self.base, &["modules"])?;
        url.query_pairs_mut().append_pair("role", role.as_str());

        tracing::debug!(url = %url, %role, "fetching modules");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatekeepError::RegistryUnavailable(format!("request failed: {e}")))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| GatekeepError::RegistryUnavailable(format!("read failed: {e}")))?;

        let modules = decode_modules(status, &body)?;
        tracing::info!(%role, modules = modules.len(), "fetched module registry");
        Ok(modules)
    }
}

// ---------------------------------------------------------------------------
// Permission store
// ---------------------------------------------------------------------------

/// `GET`/`PUT {base}/permissions/{principalId}`.
pub struct HttpPermissionStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpPermissionStore {
    pub fn new(base_url: &str, timeout: Duration) -> GatekeepResult<Self> {
        let base = parse_base(base_url)?;
        tracing::info!(base = %base, "permission store client ready");
        Ok(Self {
            client: build_client(timeout)?,
            base,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GrantData {
    #[serde(default)]
    permissions: Vec<ModulePermission>,
}

/// Decodes a store read.
///
/// Only 404 and `success: true` with `data: null` mean the principal has no
/// document. `success: false` is a failed read and becomes `Persistence`
/// carrying the server message. A body whose permissions fail to decode is a
/// `Validation` error.
pub fn decode_grant(principal_id: &str, status: u16, body: &str) -> GatekeepResult<PermissionGrant> {
    if status == StatusCode::NOT_FOUND.as_u16() {
        return Err(GatekeepError::NotFound(format!("no grant for {principal_id}")));
    }
    if !(200..300).contains(&status) {
        return Err(GatekeepError::Persistence(format!(
            "reading grant for {principal_id}: HTTP {status}"
        )));
    }

    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        GatekeepError::Persistence(format!("reading grant for {principal_id}: bad envelope: {e}"))
    })?;

    if !envelope.success {
        return Err(GatekeepError::Persistence(format!(
            "reading grant for {principal_id}: {}",
            envelope.message.as_deref().unwrap_or("store reported failure")
        )));
    }
    let data = match envelope.data {
        Some(data) if !data.is_null() => data,
        _ => return Err(GatekeepError::NotFound(format!("no grant for {principal_id}"))),
    };

    let data: GrantData = serde_json::from_value(data).map_err(|e| {
        GatekeepError::Validation(format!("grant for {principal_id} is malformed: {e}"))
    })?;

    Ok(PermissionGrant {
        principal_id: principal_id.to_string(),
        modules: data.permissions,
    })
}

/// Decodes a store write acknowledgement. An empty 2xx body counts as success.
pub fn decode_save_ack(principal_id: &str, status: u16, body: &str) -> GatekeepResult<()> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<Envelope>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(GatekeepError::Persistence(format!(
            "saving grant for {principal_id}: {detail}"
        )));
    }
    if body.trim().is_empty() {
        return Ok(());
    }

    let ack: Envelope = serde_json::from_str(body).map_err(|e| {
        GatekeepError::Persistence(format!("saving grant for {principal_id}: bad ack: {e}"))
    })?;
    if !ack.success {
        return Err(GatekeepError::Persistence(format!(
            "saving grant for {principal_id}: {}",
            ack.message.as_deref().unwrap_or("store rejected the write")
        )));
    }
    Ok(())
}

#[async_trait]
impl PermissionStore for HttpPermissionStore {
    async fn load(&self, principal_id: &str) -> GatekeepResult<PermissionGrant> {
        let url = endpoint(&self.base, &["permissions", principal_id])?;
        tracing::debug!(url = %url, "loading grant");

        let resp = self.client.get(url).send().await.map_err(|e| {
            GatekeepError::Persistence(format!("reading grant for {principal_id}: {e}"))
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            GatekeepError::Persistence(format!("reading grant for {principal_id}: {e}"))
        })?;

        decode_grant(principal_id, status, &body)
    }

    async fn save(&self, grant: &PermissionGrant) -> GatekeepResult<()> {
        let principal_id = grant.principal_id.as_str();
        let url = endpoint(&self.base, &["permissions", principal_id])?;

        tracing::info!(principal_id, modules = grant.len(), "saving grant");

        let resp = self.client.put(url).json(grant).send().await.map_err(|e| {
            GatekeepError::Persistence(format!("saving grant for {principal_id}: {e}"))
        })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            GatekeepError::Persistence(format!("saving grant for {principal_id}: {e}"))
        })?;

        decode_save_ack(principal_id, status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::ActionKey;

    #[test]
    fn empty_base_url_rejected() {
        let err = HttpModuleRegistry::new("", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, GatekeepError::InvalidInput(_)));
        assert!(HttpPermissionStore::new("not a url", Duration::from_secs(1)).is_err());
        assert!(parse_base("mailto:ops@example.com").is_err());
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_ids() {
        let base = parse_base("https://portal.example/api/").unwrap();
        let url = endpoint(&base, &["permissions", "agent 7/x"]).unwrap();
        assert_eq!(url.as_str(), "https://portal.example/api/permissions/agent%207%2Fx");

        let bare = parse_base("https://portal.example/api").unwrap();
        let url = endpoint(&bare, &["modules"]).unwrap();
        assert_eq!(url.as_str(), "https://portal.example/api/modules");
    }

    #[test]
    fn decodes_module_list() {
        let body = r#"[
            {"moduleKey": "blogs", "label": "Blogs", "icon": "book", "order": 2,
             "subModules": [{"name": "write", "path": "/blogs/write", "icon": "pen", "order": 1}]},
            {"moduleKey": "jobs", "label": "Jobs", "icon": "briefcase", "order": 1}
        ]"#;
        let modules = decode_modules(200, body).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].sub_modules[0].path.as_deref(), Some("/blogs/write"));
        assert!(modules[1].sub_modules.is_empty());
    }

    #[test]
    fn registry_failures_are_unavailable() {
        assert!(matches!(
            decode_modules(503, ""),
            Err(GatekeepError::RegistryUnavailable(_))
        ));
        assert!(matches!(
            decode_modules(200, "{\"oops\":1}"),
            Err(GatekeepError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn decodes_grant_envelope() {
        let body = r#"{"success": true, "data": {"permissions": [
            {"module": "jobs", "actions": {"read": true}, "subModules": []}
        ]}}"#;
        let grant = decode_grant("agent-1", 200, body).unwrap();
        assert_eq!(grant.principal_id, "agent-1");
        assert!(grant.module("jobs").unwrap().actions.get(ActionKey::Read));
    }

    #[test]
    fn not_found_indicators() {
        assert!(decode_grant("a", 404, "").unwrap_err().is_not_found());
        assert!(decode_grant("a", 200, r#"{"success": true, "data": null}"#)
            .unwrap_err()
            .is_not_found());
        assert!(decode_grant("a", 200, r#"{"success": true}"#)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn failure_envelope_is_persistence_not_missing() {
        let err = decode_grant("a", 200, r#"{"success": false, "message": "database timeout"}"#)
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(matches!(err, GatekeepError::Persistence(ref m) if m.contains("database timeout")));

        let bare = decode_grant("a", 200, r#"{"success": false}"#).unwrap_err();
        assert!(matches!(bare, GatekeepError::Persistence(_)));
    }

    #[test]
    fn malformed_permissions_are_validation_errors() {
        let body = r#"{"success": true, "data": {"permissions": [
            {"module": "jobs", "actions": {"publish": true}}
        ]}}"#;
        assert!(decode_grant("a", 200, body).unwrap_err().is_validation());
    }

    #[test]
    fn store_errors_are_persistence() {
        assert!(matches!(
            decode_grant("a", 500, "boom"),
            Err(GatekeepError::Persistence(_))
        ));
        assert!(matches!(
            decode_grant("a", 200, "<html>"),
            Err(GatekeepError::Persistence(_))
        ));
    }

    #[test]
    fn save_ack() {
        assert!(decode_save_ack("a", 200, r#"{"success": true}"#).is_ok());
        assert!(decode_save_ack("a", 204, "").is_ok());

        let err = decode_save_ack("a", 200, r#"{"success": false, "message": "locked"}"#)
            .unwrap_err();
        assert!(matches!(err, GatekeepError::Persistence(ref m) if m.contains("locked")));

        let err = decode_save_ack("a", 502, "").unwrap_err();
        assert!(err.to_string().contains("HTTP 502"));
    }
}
