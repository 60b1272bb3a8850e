//! External storage backend registry, validation and mount resolution.
//!
//! This crate is the core of a pluggable external-storage layer: a catalog of
//! storage backends (SMB, S3, WebDAV, ...) and authentication mechanisms,
//! plus the services that turn configured mounts into concrete filesystem
//! mount points for a user.
//!
//! # Components
//!
//! - [`Parameter`] - one configuration field of a backend or auth mechanism,
//!   with type/flag-aware value validation
//! - [`Backend`] - a storage driver definition: configuration schema,
//!   supported auth schemes, visibility and a runtime dependency check
//! - [`AuthMechanism`] - a pluggable credential strategy that can inject
//!   derived credentials into a storage at mount time
//! - [`BackendRegistry`] - the central catalog with visibility policy and
//!   availability filtering
//! - [`StorageConfig`] - one configured mount (mount point, backend, auth
//!   mechanism, options, applicable principals)
//! - [`StoragesService`] - CRUD over storage configurations, with ordered
//!   validation before any persistence and mount lifecycle notifications
//! - [`MountResolver`] - resolves all storages applicable to a user into
//!   [`ResolvedMount`] descriptors, applying auth-mechanism manipulation
//!
//! # Registry lifecycle
//!
//! A [`BackendRegistry`] is populated once (see [`builtin`] for the shipped
//! catalog) and read-only afterwards. Registered backends and mechanisms are
//! immutable; the only mutation the registry itself performs is stripping
//! personal visibility from backends an administrator has not whitelisted
//! for user mounting.
//!
//! # Example
//!
//! ```
//! use extmount_core::{BackendRegistry, RegistryConfig, StoragesService, ServiceScope, builtin};
//! use std::sync::Arc;
//!
//! let mut registry = BackendRegistry::new(RegistryConfig::default());
//! builtin::register_backends(&mut registry);
//! builtin::register_auth_mechanisms(&mut registry);
//! let registry = Arc::new(registry);
//!
//! let service = StoragesService::new(Arc::clone(&registry), ServiceScope::Global);
//! let storage = service
//!     .create_storage("documents", "local", "auth::null", Default::default())
//!     .unwrap();
//! assert_eq!(storage.mount_point(), "/documents");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod backend;
mod config;
mod dependency;
mod param;
mod probe;
mod registry;
mod resolver;
mod service;
mod visibility;

/// Shipped catalog of storage backends and authentication mechanisms.
pub mod builtin;

pub use auth::{
    AuthMechanism, BasicCredentials, CredentialSource, NullCredentials, NULL_MECHANISM,
    PASSWORD_MECHANISM, SCHEME_NULL, SCHEME_PASSWORD,
};
pub use backend::{Backend, PRIORITY_DEFAULT};
pub use config::{BackendStatus, OptionMap, StorageConfig};
pub use dependency::{
    normalize_check_result, DependencyCheck, DependencyCheckResult, MissingDependency,
};
pub use param::{Parameter, ParameterFlags, ParameterKind};
pub use probe::{ConnectivityProbe, IndeterminateProbe};
pub use registry::{BackendRegistry, RegistryConfig};
pub use resolver::{
    MountResolver, ObjectStore, ObjectStoreFactory, ObjectStoreRegistry, ResolvedMount,
    ResolverError,
};
pub use service::{
    MountEvent, MountType, ServiceError, ServiceScope, StoragesService, ValidationError,
};
pub use visibility::{Visibility, VisibilitySet};
