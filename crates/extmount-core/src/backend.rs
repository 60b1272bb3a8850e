//! Storage backend definitions.

use std::collections::BTreeSet;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::auth::SCHEME_NULL;
use crate::config::StorageConfig;
use crate::dependency::{normalize_check_result, DependencyCheck, MissingDependency};
use crate::param::Parameter;
use crate::visibility::{Visibility, VisibilitySet};

/// Initial priority of a backend. Priority breaks ties when multiple
/// backends apply to the same mount point; presentation ordering is by
/// display name, never by priority.
pub const PRIORITY_DEFAULT: i32 = 100;

/// One storage driver definition: class identity, configuration schema,
/// supported authentication schemes, visibility and an optional runtime
/// dependency check.
///
/// Backends are built fluently and become immutable once registered in the
/// [`BackendRegistry`](crate::BackendRegistry), which owns them.
#[derive(Clone)]
pub struct Backend {
    class_id: String,
    display_name: String,
    parameters: Vec<Parameter>,
    auth_schemes: BTreeSet<String>,
    legacy_auth_mechanism_class: String,
    priority: i32,
    dependency_check: Option<DependencyCheck>,
    visibility: VisibilitySet,
    custom_js: Option<String>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("class_id", &self.class_id)
            .field("display_name", &self.display_name)
            .field("parameters", &self.parameters)
            .field("auth_schemes", &self.auth_schemes)
            .field("priority", &self.priority)
            .field("has_dependency_check", &self.dependency_check.is_some())
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Create a backend with the given class id, display name and
    /// configuration parameters.
    pub fn new(
        class_id: impl Into<String>,
        display_name: impl Into<String>,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            display_name: display_name.into(),
            parameters,
            auth_schemes: BTreeSet::new(),
            legacy_auth_mechanism_class: crate::auth::NULL_MECHANISM.to_owned(),
            priority: PRIORITY_DEFAULT,
            dependency_check: None,
            visibility: VisibilitySet::default(),
            custom_js: None,
        }
    }

    /// Declare a supported authentication scheme.
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_schemes.insert(scheme.into());
        self
    }

    /// Set the fallback mechanism class for storage configurations that
    /// predate explicit auth-mechanism selection.
    #[must_use]
    pub fn with_legacy_auth_mechanism(mut self, class_id: impl Into<String>) -> Self {
        self.legacy_auth_mechanism_class = class_id.into();
        self
    }

    /// Set the initial priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Register a runtime dependency check. A backend without one is always
    /// considered available.
    #[must_use]
    pub fn with_dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = Some(check);
        self
    }

    /// Restrict the allowed-visibility ceiling.
    #[must_use]
    pub fn with_allowed_visibility(mut self, allowed: Visibility) -> Self {
        self.visibility.set_allowed(allowed);
        self
    }

    /// Attach a custom front-end asset path.
    #[must_use]
    pub fn with_custom_js(mut self, path: impl Into<String>) -> Self {
        self.custom_js = Some(path.into());
        self
    }

    /// The registry key.
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Configuration parameters of this backend.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Supported authentication schemes.
    ///
    /// Invariant: a backend that declared no scheme supports exactly
    /// [`SCHEME_NULL`], so it still resolves to a usable no-auth mechanism.
    pub fn auth_schemes(&self) -> BTreeSet<String> {
        if self.auth_schemes.is_empty() {
            return BTreeSet::from([SCHEME_NULL.to_owned()]);
        }
        self.auth_schemes.clone()
    }

    /// Fallback mechanism class for legacy storage configurations.
    pub fn legacy_auth_mechanism_class(&self) -> &str {
        &self.legacy_auth_mechanism_class
    }

    /// The initial priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether a dependency check is registered.
    pub fn has_dependency_check(&self) -> bool {
        self.dependency_check.is_some()
    }

    /// Custom front-end asset path, if any.
    pub fn custom_js(&self) -> Option<&str> {
        self.custom_js.as_deref()
    }

    /// Run the dependency check and return the unmet dependencies. An empty
    /// list means the backend is usable; no registered check means always
    /// available. Failures demote the backend to "unavailable" for listing
    /// and validation but never remove its registration.
    pub fn check_dependencies(&self) -> Vec<MissingDependency> {
        match &self.dependency_check {
            Some(check) => normalize_check_result(check(), &self.class_id),
            None => Vec::new(),
        }
    }

    /// Check whether every parameter of this backend validates against the
    /// storage's backend options.
    pub fn validate_storage(&self, storage: &StorageConfig) -> bool {
        let options = storage.backend_options();
        self.parameters
            .iter()
            .all(|parameter| parameter.validate_value(options.get(parameter.name())))
    }

    /// Bit containment test against the current visibility.
    pub fn is_visible_for(&self, flag: Visibility) -> bool {
        self.visibility.is_visible_for(flag)
    }

    /// Bit containment test against the allowed-visibility ceiling.
    pub fn is_allowed_visible_for(&self, flag: Visibility) -> bool {
        self.visibility.is_allowed_visible_for(flag)
    }

    pub(crate) fn remove_visibility(&mut self, flag: Visibility) {
        self.visibility.remove_visible(flag);
    }
}

/// Serializes into the descriptor consumed by the administrative front-end:
/// `{"backend": ..., "priority": ..., "configuration": {...},
/// "authSchemes": {scheme: true}, "custom"?: ...}`.
impl Serialize for Backend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let configuration: std::collections::BTreeMap<&str, &Parameter> = self
            .parameters
            .iter()
            .map(|parameter| (parameter.name(), parameter))
            .collect();
        let auth_schemes: std::collections::BTreeMap<String, bool> = self
            .auth_schemes()
            .into_iter()
            .map(|scheme| (scheme, true))
            .collect();

        let len = if self.custom_js.is_some() { 5 } else { 4 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("backend", &self.display_name)?;
        map.serialize_entry("priority", &self.priority)?;
        map.serialize_entry("configuration", &configuration)?;
        map.serialize_entry("authSchemes", &auth_schemes)?;
        if let Some(custom) = &self.custom_js {
            map.serialize_entry("custom", custom)?;
        }
        map.end()
    }
}
