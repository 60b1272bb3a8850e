//! Authentication mechanisms for external storage backends.
//!
//! An [`AuthMechanism`] describes one credential strategy: its scheme tag,
//! configuration parameters and a [`CredentialSource`] that can inject
//! derived credentials into a storage at mount time. Mechanisms are
//! registered once in the [`BackendRegistry`](crate::BackendRegistry) and
//! immutable afterwards.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::backend::Backend;
use crate::config::StorageConfig;
use crate::param::Parameter;
use crate::visibility::{Visibility, VisibilitySet};

/// Scheme tag of the no-authentication mechanism. Backends that declare no
/// auth scheme implicitly support exactly this one.
pub const SCHEME_NULL: &str = "null";

/// Scheme tag of username/password mechanisms.
pub const SCHEME_PASSWORD: &str = "password";

/// Class id of the shipped "None" mechanism; also the default legacy
/// fallback for backends that predate explicit auth-mechanism selection.
pub const NULL_MECHANISM: &str = "auth::null";

/// Class id of the shipped "Username and password" mechanism.
pub const PASSWORD_MECHANISM: &str = "auth::password";

/// Runtime side of an authentication mechanism: a hook that may mutate a
/// storage's backend options before the driver opens a connection.
///
/// Invoked exactly once per mount resolution, after validation. Typical
/// implementations inject session credentials or tokens; the null mechanism
/// does nothing.
pub trait CredentialSource: Send + Sync {
    /// Inject derived credentials into the storage's backend options.
    fn manipulate_storage(&self, storage: &mut StorageConfig);
}

/// Credential source of the "None" mechanism: a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCredentials;

impl CredentialSource for NullCredentials {
    fn manipulate_storage(&self, _storage: &mut StorageConfig) {}
}

/// Credential source for explicit username/password configuration. The
/// credentials already live in the backend options, so nothing needs to be
/// injected at mount time.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCredentials;

impl CredentialSource for BasicCredentials {
    fn manipulate_storage(&self, _storage: &mut StorageConfig) {}
}

/// One authentication scheme: class identity, scheme tag, display name,
/// parameter list and the runtime credential hook.
#[derive(Clone)]
pub struct AuthMechanism {
    class_id: String,
    scheme: String,
    display_name: String,
    parameters: Vec<Parameter>,
    visibility: VisibilitySet,
    credentials: Arc<dyn CredentialSource>,
    custom_js: Option<String>,
}

impl fmt::Debug for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthMechanism")
            .field("class_id", &self.class_id)
            .field("scheme", &self.scheme)
            .field("display_name", &self.display_name)
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

impl AuthMechanism {
    /// Create a mechanism for the given scheme with the given class id,
    /// display name, parameters and credential hook.
    pub fn new(
        scheme: impl Into<String>,
        class_id: impl Into<String>,
        display_name: impl Into<String>,
        parameters: Vec<Parameter>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            scheme: scheme.into(),
            display_name: display_name.into(),
            parameters,
            visibility: VisibilitySet::default(),
            credentials,
            custom_js: None,
        }
    }

    /// Attach a custom front-end asset path.
    #[must_use]
    pub fn with_custom_js(mut self, path: impl Into<String>) -> Self {
        self.custom_js = Some(path.into());
        self
    }

    /// Restrict the allowed-visibility ceiling.
    #[must_use]
    pub fn with_allowed_visibility(mut self, allowed: Visibility) -> Self {
        self.visibility.set_allowed(allowed);
        self
    }

    /// The registry key.
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// The scheme tag, e.g. `"null"` or `"password"`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Configuration parameters of this mechanism.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Custom front-end asset path, if any.
    pub fn custom_js(&self) -> Option<&str> {
        self.custom_js.as_deref()
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

    /// Check whether a storage configuration satisfies this mechanism:
    /// the storage's backend must advertise this mechanism's scheme (an
    /// empty scheme set implicitly supports only [`SCHEME_NULL`]) and every
    /// parameter must validate against the storage's backend options.
    pub fn validate_storage(&self, storage: &StorageConfig, backend: &Backend) -> bool {
        if !backend.auth_schemes().contains(self.scheme.as_str()) {
            return false;
        }
        let options = storage.backend_options();
        self.parameters
            .iter()
            .all(|parameter| parameter.validate_value(options.get(parameter.name())))
    }

    /// Run the credential hook against a storage, letting the mechanism
    /// inject derived credentials before the backend driver connects.
    pub fn manipulate_storage(&self, storage: &mut StorageConfig) {
        self.credentials.manipulate_storage(storage);
    }
}

/// Serializes into the descriptor consumed by the administrative front-end:
/// `{"scheme": ..., "name": ..., "configuration": {...}, "custom"?: ...}`.
impl Serialize for AuthMechanism {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let configuration: std::collections::BTreeMap<&str, &Parameter> = self
            .parameters
            .iter()
            .map(|parameter| (parameter.name(), parameter))
            .collect();

        let len = if self.custom_js.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("scheme", &self.scheme)?;
        map.serialize_entry("name", &self.display_name)?;
        map.serialize_entry("configuration", &configuration)?;
        if let Some(custom) = &self.custom_js {
            map.serialize_entry("custom", custom)?;
        }
        map.end()
    }
}
