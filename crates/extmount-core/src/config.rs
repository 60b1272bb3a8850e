//! Storage configurations: one configured mount each.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key-value options, keyed by parameter name.
pub type OptionMap = BTreeMap<String, Value>;

/// Result of a connectivity probe against a configured storage.
///
/// Derived state, set only on read-for-display paths; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    /// The storage could not be probed (e.g. no probe implementation).
    Indeterminate,
    /// The storage is reachable.
    Success,
    /// The storage is configured but unreachable or misconfigured.
    Error,
}

/// One configured mount: mount point, backend, auth mechanism, options and
/// the principals it applies to.
///
/// Backend and auth mechanism are referenced by class id; they are owned by
/// the [`BackendRegistry`](crate::BackendRegistry) and resolved at use. The
/// `id` is assigned by [`StoragesService`](crate::StoragesService) on first
/// persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    id: Option<u64>,
    mount_point: String,
    backend_class: String,
    auth_mechanism_class: String,
    #[serde(default)]
    backend_options: OptionMap,
    #[serde(default, skip_serializing_if = "OptionMap::is_empty")]
    mount_options: OptionMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    applicable_users: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    applicable_groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    priority: Option<i32>,
    // transient, recomputed on every show/resolve
    #[serde(skip)]
    status: Option<BackendStatus>,
}

impl StorageConfig {
    /// Create a storage configuration for the given backend and auth
    /// mechanism class ids. The mount point is normalized to a single
    /// leading `/`.
    pub fn new(
        mount_point: impl AsRef<str>,
        backend_class: impl Into<String>,
        auth_mechanism_class: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            mount_point: normalize_mount_point(mount_point.as_ref()),
            backend_class: backend_class.into(),
            auth_mechanism_class: auth_mechanism_class.into(),
            backend_options: OptionMap::new(),
            mount_options: OptionMap::new(),
            applicable_users: Vec::new(),
            applicable_groups: Vec::new(),
            priority: None,
            status: None,
        }
    }

    /// Persistent id, assigned by the storages service.
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    /// The normalized mount point, always starting with `/`.
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Replace the mount point, normalizing to a single leading `/`.
    pub fn set_mount_point(&mut self, mount_point: impl AsRef<str>) {
        self.mount_point = normalize_mount_point(mount_point.as_ref());
    }

    /// Class id of the storage backend.
    pub fn backend_class(&self) -> &str {
        &self.backend_class
    }

    /// Class id of the authentication mechanism.
    pub fn auth_mechanism_class(&self) -> &str {
        &self.auth_mechanism_class
    }

    /// Backend-specific options, keyed by parameter name.
    pub fn backend_options(&self) -> &OptionMap {
        &self.backend_options
    }

    /// Replace all backend options.
    pub fn set_backend_options(&mut self, options: OptionMap) {
        self.backend_options = options;
    }

    /// Look up one backend option.
    pub fn backend_option(&self, name: &str) -> Option<&Value> {
        self.backend_options.get(name)
    }

    /// Set one backend option. Auth mechanisms use this at mount time to
    /// inject derived credentials.
    pub fn set_backend_option(&mut self, name: impl Into<String>, value: Value) {
        self.backend_options.insert(name.into(), value);
    }

    /// Remove one backend option, returning its previous value.
    pub fn remove_backend_option(&mut self, name: &str) -> Option<Value> {
        self.backend_options.remove(name)
    }

    /// Mount-specific options (e.g. `priority`).
    pub fn mount_options(&self) -> &OptionMap {
        &self.mount_options
    }

    /// Replace all mount options.
    pub fn set_mount_options(&mut self, options: OptionMap) {
        self.mount_options = options;
    }

    /// Users this storage applies to; empty means all (for global mounts).
    pub fn applicable_users(&self) -> &[String] {
        &self.applicable_users
    }

    /// Replace the applicable users.
    pub fn set_applicable_users(&mut self, users: Vec<String>) {
        self.applicable_users = users;
    }

    /// Groups this storage applies to; empty means all (for global mounts).
    pub fn applicable_groups(&self) -> &[String] {
        &self.applicable_groups
    }

    /// Replace the applicable groups.
    pub fn set_applicable_groups(&mut self, groups: Vec<String>) {
        self.applicable_groups = groups;
    }

    /// Mount priority override, if configured.
    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    /// Set the mount priority override.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = Some(priority);
    }

    /// Last probed status, if a probe ran for this instance.
    pub fn status(&self) -> Option<BackendStatus> {
        self.status
    }

    /// Record a probed status on this instance.
    pub fn set_status(&mut self, status: BackendStatus) {
        self.status = Some(status);
    }
}

fn normalize_mount_point(mount_point: &str) -> String {
    format!("/{}", mount_point.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mount_point_gains_single_leading_slash() {
        let storage = StorageConfig::new("mount", "smb", "auth::null");
        assert_eq!(storage.mount_point(), "/mount");

        let mut storage = StorageConfig::new("//double", "smb", "auth::null");
        assert_eq!(storage.mount_point(), "/double");

        storage.set_mount_point("");
        assert_eq!(storage.mount_point(), "/");
    }

    #[test]
    fn status_is_transient() {
        let mut storage = StorageConfig::new("docs", "smb", "auth::null");
        storage.set_id(3);
        storage.set_status(BackendStatus::Error);

        let json = serde_json::to_value(&storage).unwrap();
        assert_eq!(json["id"], json!(3));
        assert_eq!(json["mountPoint"], json!("/docs"));
        assert!(json.get("status").is_none());

        let restored: StorageConfig = serde_json::from_value(json).unwrap();
        assert_eq!(restored.status(), None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut storage = StorageConfig::new("docs", "smb", "auth::password");
        storage.set_backend_option("host", json!("fileserver"));
        storage.set_applicable_users(vec!["alice".into()]);
        storage.set_priority(150);

        let json = serde_json::to_value(&storage).unwrap();
        assert_eq!(json["backendClass"], json!("smb"));
        assert_eq!(json["authMechanismClass"], json!("auth::password"));
        assert_eq!(json["backendOptions"]["host"], json!("fileserver"));
        assert_eq!(json["applicableUsers"], json!(["alice"]));
        assert_eq!(json["priority"], json!(150));
        assert!(json.get("applicableGroups").is_none());
    }
}
