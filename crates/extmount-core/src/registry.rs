//! Central catalog of storage backends and authentication mechanisms.

use std::collections::BTreeMap;

use tracing::debug;

use crate::auth::AuthMechanism;
use crate::backend::Backend;
use crate::visibility::Visibility;

/// Configuration scalars the registry reads at construction.
///
/// Passed explicitly; the registry never consults ambient state.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Whether end users may create their own mounts at all.
    pub allow_user_mounting: bool,
    /// Class ids of the backends users may mount; empty means none.
    pub user_mounting_backends: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_user_mounting: true,
            user_mounting_backends: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Parse from the stored application values: `allow_user_mounting`
    /// (`"yes"` means enabled, anything else disabled, default `"yes"`) and
    /// `user_mounting_backends` (comma-separated class ids, default empty).
    pub fn from_app_values(allow_user_mounting: &str, user_mounting_backends: &str) -> Self {
        Self {
            allow_user_mounting: allow_user_mounting == "yes",
            user_mounting_backends: user_mounting_backends
                .split(',')
                .map(str::trim)
                .filter(|class| !class.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        }
    }
}

/// Catalog of registered backends and auth mechanisms.
///
/// Populated once at startup, read-only thereafter. Registration applies
/// visibility policy: backends an administrator has not whitelisted for
/// user mounting lose their personal visibility bit (administrators can
/// still configure them; end users cannot).
pub struct BackendRegistry {
    allow_user_mounting: bool,
    user_mounting_backends: Vec<String>,
    backends: BTreeMap<String, Backend>,
    auth_mechanisms: BTreeMap<String, AuthMechanism>,
}

impl BackendRegistry {
    /// Create an empty registry with the given configuration.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            allow_user_mounting: config.allow_user_mounting,
            user_mounting_backends: config.user_mounting_backends,
            backends: BTreeMap::new(),
            auth_mechanisms: BTreeMap::new(),
        }
    }

    /// Register a backend, keyed by class id. Re-registration replaces the
    /// previous entry. Strips personal visibility unless the backend is
    /// whitelisted for user mounting.
    pub fn register_backend(&mut self, mut backend: Backend) {
        if !self.is_allowed_user_backend(&backend) {
            backend.remove_visibility(Visibility::PERSONAL);
        }
        debug!(class = backend.class_id(), name = backend.display_name(), "registering backend");
        self.backends.insert(backend.class_id().to_owned(), backend);
    }

    /// Register an authentication mechanism, keyed by class id.
    pub fn register_auth_mechanism(&mut self, mut mechanism: AuthMechanism) {
        if !self.is_allowed_user_mechanism(&mechanism) {
            mechanism.remove_visibility(Visibility::PERSONAL);
        }
        debug!(
            class = mechanism.class_id(),
            scheme = mechanism.scheme(),
            "registering auth mechanism"
        );
        self.auth_mechanisms
            .insert(mechanism.class_id().to_owned(), mechanism);
    }

    /// All registered backends, ordered by display name for presentation.
    pub fn backends(&self) -> Vec<&Backend> {
        let mut backends: Vec<&Backend> = self.backends.values().collect();
        backends.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        backends
    }

    /// Backends whose dependency checks pass.
    pub fn available_backends(&self) -> Vec<&Backend> {
        self.backends()
            .into_iter()
            .filter(|backend| backend.check_dependencies().is_empty())
            .collect()
    }

    /// Available backends visible for the given flag.
    pub fn backends_visible_for(&self, flag: Visibility) -> Vec<&Backend> {
        self.available_backends()
            .into_iter()
            .filter(|backend| backend.is_visible_for(flag))
            .collect()
    }

    /// Available backends allowed to be visible for the given flag.
    pub fn backends_allowed_visible_for(&self, flag: Visibility) -> Vec<&Backend> {
        self.available_backends()
            .into_iter()
            .filter(|backend| backend.is_allowed_visible_for(flag))
            .collect()
    }

    /// Look up a backend by class id. Absent means "unknown backend";
    /// callers reject the configuration rather than crash.
    pub fn backend(&self, class_id: &str) -> Option<&Backend> {
        self.backends.get(class_id)
    }

    /// All registered auth mechanisms, ordered by display name.
    pub fn auth_mechanisms(&self) -> Vec<&AuthMechanism> {
        let mut mechanisms: Vec<&AuthMechanism> = self.auth_mechanisms.values().collect();
        mechanisms.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        mechanisms
    }

    /// Auth mechanisms whose scheme is in the given set.
    pub fn auth_mechanisms_by_scheme<'a, I>(&self, schemes: I) -> Vec<&AuthMechanism>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let schemes: Vec<&str> = schemes.into_iter().collect();
        self.auth_mechanisms()
            .into_iter()
            .filter(|mechanism| schemes.contains(&mechanism.scheme()))
            .collect()
    }

    /// Auth mechanisms visible for the given flag.
    pub fn auth_mechanisms_visible_for(&self, flag: Visibility) -> Vec<&AuthMechanism> {
        self.auth_mechanisms()
            .into_iter()
            .filter(|mechanism| mechanism.is_visible_for(flag))
            .collect()
    }

    /// Auth mechanisms allowed to be visible for the given flag.
    pub fn auth_mechanisms_allowed_visible_for(&self, flag: Visibility) -> Vec<&AuthMechanism> {
        self.auth_mechanisms()
            .into_iter()
            .filter(|mechanism| mechanism.is_allowed_visible_for(flag))
            .collect()
    }

    /// Look up an auth mechanism by class id.
    pub fn auth_mechanism(&self, class_id: &str) -> Option<&AuthMechanism> {
        self.auth_mechanisms.get(class_id)
    }

    /// Whether end users may create their own mounts at all.
    pub fn is_user_mounting_allowed(&self) -> bool {
        self.allow_user_mounting
    }

    fn is_allowed_user_backend(&self, backend: &Backend) -> bool {
        self.allow_user_mounting
            && self
                .user_mounting_backends
                .iter()
                .any(|class| class == backend.class_id())
    }

    // Extension point; per-mechanism user restrictions are not implemented.
    #[allow(clippy::unused_self)]
    fn is_allowed_user_mechanism(&self, _mechanism: &AuthMechanism) -> bool {
        true
    }
}
