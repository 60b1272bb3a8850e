//! Runtime dependency checks for storage backends.
//!
//! A backend may register a [`DependencyCheck`] probing whether its runtime
//! prerequisites (helper binaries, system libraries) are present. Checks
//! historically returned heterogeneous shapes; [`DependencyCheckResult`]
//! captures each shape as an explicit variant and
//! [`normalize_check_result`] collapses them into a uniform list of
//! [`MissingDependency`] values. An empty list means the backend is usable.

use std::sync::Arc;

/// Callable registered on a backend to probe its runtime prerequisites.
pub type DependencyCheck = Arc<dyn Fn() -> DependencyCheckResult + Send + Sync>;

/// One unmet runtime prerequisite of a backend.
///
/// The owning backend is referenced by its class id rather than a strong
/// reference, so these values carry no lifecycle coupling. Created
/// transiently by [`Backend::check_dependencies`](crate::Backend::check_dependencies)
/// and consumed immediately; never persisted.
#[derive(Debug, Clone)]
pub struct MissingDependency {
    module: String,
    backend: String,
    message: Option<String>,
}

impl MissingDependency {
    /// Create a missing dependency for the given module, owned by the
    /// backend with the given class id.
    pub fn new(module: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            backend: backend.into(),
            message: None,
        }
    }

    /// Attach a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The missing module's name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Class id of the backend this dependency belongs to.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Human-readable message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

// Equality deliberately ignores the message: two reports of the same module
// for the same backend are the same failure.
impl PartialEq for MissingDependency {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && self.backend == other.backend
    }
}

impl Eq for MissingDependency {}

/// Outcome of a [`DependencyCheck`].
///
/// The three data-bearing variants mirror the result shapes dependency
/// checks have historically produced: bare module names, module names with
/// messages, and fully-constructed [`MissingDependency`] values.
#[derive(Debug, Clone)]
pub enum DependencyCheckResult {
    /// All prerequisites are present.
    Satisfied,
    /// Missing modules, names only.
    MissingModules(Vec<String>),
    /// Missing modules with human-readable messages.
    MissingWithMessages(Vec<(String, String)>),
    /// Already-constructed missing-dependency values, passed through.
    Missing(Vec<MissingDependency>),
}

/// Normalize a check result into a uniform list of missing dependencies,
/// attributed to the backend with the given class id.
pub fn normalize_check_result(
    result: DependencyCheckResult,
    backend_class: &str,
) -> Vec<MissingDependency> {
    match result {
        DependencyCheckResult::Satisfied => Vec::new(),
        DependencyCheckResult::MissingModules(modules) => modules
            .into_iter()
            .map(|module| MissingDependency::new(module, backend_class))
            .collect(),
        DependencyCheckResult::MissingWithMessages(entries) => entries
            .into_iter()
            .map(|(module, message)| {
                MissingDependency::new(module, backend_class).with_message(message)
            })
            .collect(),
        DependencyCheckResult::Missing(deps) => deps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_normalizes_to_empty() {
        assert!(normalize_check_result(DependencyCheckResult::Satisfied, "smb").is_empty());
    }

    #[test]
    fn bare_modules_get_backend_attribution() {
        let deps = normalize_check_result(
            DependencyCheckResult::MissingModules(vec!["smbclient".into()]),
            "smb",
        );
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].module(), "smbclient");
        assert_eq!(deps[0].backend(), "smb");
        assert_eq!(deps[0].message(), None);
    }

    #[test]
    fn messaged_modules_keep_their_message() {
        let deps = normalize_check_result(
            DependencyCheckResult::MissingWithMessages(vec![(
                "curl".into(),
                "curl is required".into(),
            )]),
            "dav",
        );
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].module(), "curl");
        assert_eq!(deps[0].message(), Some("curl is required"));
    }

    #[test]
    fn constructed_dependencies_pass_through() {
        let dep = MissingDependency::new("ftp", "ftp").with_message("ftp support missing");
        let deps =
            normalize_check_result(DependencyCheckResult::Missing(vec![dep.clone()]), "other");
        assert_eq!(deps, vec![dep]);
    }

    #[test]
    fn equality_ignores_message() {
        let a = MissingDependency::new("curl", "dav");
        let b = MissingDependency::new("curl", "dav").with_message("install curl");
        let c = MissingDependency::new("curl", "smb");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
