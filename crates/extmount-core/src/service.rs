//! CRUD service over storage configurations.
//!
//! A [`StoragesService`] manages one collection of storages: either the
//! global collection or one user's personal collection. Collections have
//! disjoint id spaces. All validation happens before any persistence side
//! effect, so partial writes are impossible. Mount lifecycle notifications
//! are synchronous fire-and-observe; observers cannot fail a CRUD call.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{OptionMap, StorageConfig};
use crate::probe::ConnectivityProbe;
use crate::registry::BackendRegistry;

/// Which collection a service manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceScope {
    /// Administrator-managed storages, mountable for many principals.
    Global,
    /// One user's personal storages.
    Personal(String),
}

/// Principal kind a mount lifecycle notification applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    /// Mounted for specific users.
    User,
    /// Mounted for specific groups.
    Group,
    /// Mounted for everyone.
    Global,
}

/// Mount lifecycle notification, emitted on create and delete (and on
/// update when the mount point or applicability changed). Consumed by the
/// filesystem layer to invalidate caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MountEvent {
    /// A mount became available for the given principals.
    Created {
        /// Absolute mount path.
        path: String,
        /// Principal kind.
        mount_type: MountType,
        /// Principal ids; empty for [`MountType::Global`].
        applicable: Vec<String>,
    },
    /// A mount was removed for the given principals.
    Removed {
        /// Absolute mount path.
        path: String,
        /// Principal kind.
        mount_type: MountType,
        /// Principal ids; empty for [`MountType::Global`].
        applicable: Vec<String>,
    },
}

/// Validation failure for a storage configuration. Checks run in order and
/// the first failure short-circuits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The mount point is empty or the bare root.
    #[error("invalid mount point \"{0}\"")]
    InvalidMountPoint(String),
    /// The backend is unregistered or its dependencies are unsatisfied.
    #[error("invalid storage backend \"{0}\"")]
    InvalidBackend(String),
    /// A backend or auth-mechanism parameter failed validation.
    #[error("unsatisfied parameters for \"{0}\"")]
    UnsatisfiedParameters(String),
}

/// Failure of a storages-service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An unknown backend or auth-mechanism class id was supplied.
    #[error("invalid class \"{0}\"")]
    InvalidArgument(String),
    /// No storage with the given id exists in this collection.
    #[error("storage with id {0} not found")]
    NotFound(u64),
    /// The configuration failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The storages file could not be read or written.
    #[error("storages file error: {0}")]
    Persistence(#[from] std::io::Error),
    /// The storages file could not be encoded or decoded.
    #[error("storages file is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
}

type Observer = Box<dyn Fn(&MountEvent) + Send + Sync>;

/// Creates, validates, persists, updates and deletes storage
/// configurations for one collection.
pub struct StoragesService {
    registry: Arc<BackendRegistry>,
    scope: ServiceScope,
    storages: std::collections::BTreeMap<u64, StorageConfig>,
    next_id: u64,
    observers: Vec<Observer>,
    storages_file: Option<PathBuf>,
}

impl StoragesService {
    /// Create an in-memory service for the given collection.
    pub fn new(registry: Arc<BackendRegistry>, scope: ServiceScope) -> Self {
        Self {
            registry,
            scope,
            storages: std::collections::BTreeMap::new(),
            next_id: 1,
            observers: Vec::new(),
            storages_file: None,
        }
    }

    /// Create a service backed by a JSON storages file. An existing file is
    /// loaded; every mutation rewrites it.
    pub fn with_storages_file(
        registry: Arc<BackendRegistry>,
        scope: ServiceScope,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ServiceError> {
        let path = path.into();
        let mut service = Self::new(registry, scope);
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let stored: Vec<StorageConfig> = serde_json::from_str(&raw)?;
            for storage in stored {
                if let Some(id) = storage.id() {
                    service.next_id = service.next_id.max(id + 1);
                    service.storages.insert(id, storage);
                }
            }
            debug!(count = service.storages.len(), path = %path.display(), "loaded storages file");
        }
        service.storages_file = Some(path);
        Ok(service)
    }

    /// The collection this service manages.
    pub fn scope(&self) -> &ServiceScope {
        &self.scope
    }

    /// Subscribe to mount lifecycle notifications.
    pub fn subscribe(&mut self, observer: impl Fn(&MountEvent) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Construct a storage configuration from its parameters.
    ///
    /// Both class ids are resolved through the registry; an unknown id
    /// fails with [`ServiceError::InvalidArgument`]. The mount point is
    /// normalized to a leading `/`. Pure construction plus lookup; nothing
    /// is persisted.
    pub fn create_storage(
        &self,
        mount_point: &str,
        backend_class: &str,
        auth_mechanism_class: &str,
        backend_options: OptionMap,
    ) -> Result<StorageConfig, ServiceError> {
        self.create_storage_full(
            mount_point,
            backend_class,
            auth_mechanism_class,
            backend_options,
            None,
            None,
            None,
            None,
        )
    }

    /// [`create_storage`](Self::create_storage) with mount options,
    /// applicability and priority.
    #[allow(clippy::too_many_arguments)]
    pub fn create_storage_full(
        &self,
        mount_point: &str,
        backend_class: &str,
        auth_mechanism_class: &str,
        backend_options: OptionMap,
        mount_options: Option<OptionMap>,
        applicable_users: Option<Vec<String>>,
        applicable_groups: Option<Vec<String>>,
        priority: Option<i32>,
    ) -> Result<StorageConfig, ServiceError> {
        if self.registry.backend(backend_class).is_none() {
            return Err(ServiceError::InvalidArgument(backend_class.to_owned()));
        }
        if self.registry.auth_mechanism(auth_mechanism_class).is_none() {
            return Err(ServiceError::InvalidArgument(
                auth_mechanism_class.to_owned(),
            ));
        }

        let mut storage = StorageConfig::new(mount_point, backend_class, auth_mechanism_class);
        storage.set_backend_options(backend_options);
        if let Some(options) = mount_options {
            storage.set_mount_options(options);
        }
        if let Some(users) = applicable_users {
            storage.set_applicable_users(users);
        }
        if let Some(groups) = applicable_groups {
            storage.set_applicable_groups(groups);
        }
        if let Some(priority) = priority {
            storage.set_priority(priority);
        }
        Ok(storage)
    }

    /// Validate a storage configuration. Ordered, short-circuiting checks:
    /// mount point, backend registration and dependencies, backend
    /// parameters, auth-mechanism scheme and parameters.
    pub fn validate(&self, storage: &StorageConfig) -> Result<(), ValidationError> {
        let mount_point = storage.mount_point();
        if mount_point.is_empty() || mount_point == "/" {
            return Err(ValidationError::InvalidMountPoint(mount_point.to_owned()));
        }

        let backend = self
            .registry
            .backend(storage.backend_class())
            .ok_or_else(|| ValidationError::InvalidBackend(storage.backend_class().to_owned()))?;
        if !backend.check_dependencies().is_empty() {
            return Err(ValidationError::InvalidBackend(
                storage.backend_class().to_owned(),
            ));
        }

        if !backend.validate_storage(storage) {
            return Err(ValidationError::UnsatisfiedParameters(
                storage.backend_class().to_owned(),
            ));
        }

        // A mechanism unregistered since creation can never be satisfied.
        let mechanism = self
            .registry
            .auth_mechanism(storage.auth_mechanism_class())
            .ok_or_else(|| {
                ValidationError::UnsatisfiedParameters(storage.auth_mechanism_class().to_owned())
            })?;
        if !mechanism.validate_storage(storage, backend) {
            return Err(ValidationError::UnsatisfiedParameters(
                storage.auth_mechanism_class().to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate and persist a new storage, assigning the next id in this
    /// collection, and fire mount-created notifications.
    pub fn add_storage(&mut self, mut storage: StorageConfig) -> Result<StorageConfig, ServiceError> {
        self.validate(&storage)?;

        let id = self.next_id;
        self.next_id += 1;
        storage.set_id(id);
        self.storages.insert(id, storage.clone());
        self.persist()?;

        info!(id, mount_point = storage.mount_point(), "added storage");
        for event in self.lifecycle_events(&storage, Lifecycle::Created) {
            self.notify(&event);
        }
        Ok(storage)
    }

    /// Validate and replace a stored storage, re-firing lifecycle
    /// notifications when the mount point or applicability changed.
    pub fn update_storage(&mut self, storage: StorageConfig) -> Result<StorageConfig, ServiceError> {
        let id = storage
            .id()
            .ok_or_else(|| ServiceError::InvalidArgument("storage has no id".to_owned()))?;
        let previous = self
            .storages
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(id))?;

        self.validate(&storage)?;
        self.storages.insert(id, storage.clone());
        self.persist()?;

        info!(id, mount_point = storage.mount_point(), "updated storage");
        let changed = previous.mount_point() != storage.mount_point()
            || previous.applicable_users() != storage.applicable_users()
            || previous.applicable_groups() != storage.applicable_groups();
        if changed {
            for event in self.lifecycle_events(&previous, Lifecycle::Removed) {
                self.notify(&event);
            }
            for event in self.lifecycle_events(&storage, Lifecycle::Created) {
                self.notify(&event);
            }
        }
        Ok(storage)
    }

    /// Delete a storage and fire mount-removed notifications.
    pub fn remove_storage(&mut self, id: u64) -> Result<(), ServiceError> {
        let storage = self
            .storages
            .remove(&id)
            .ok_or(ServiceError::NotFound(id))?;
        self.persist()?;

        info!(id, mount_point = storage.mount_point(), "removed storage");
        for event in self.lifecycle_events(&storage, Lifecycle::Removed) {
            self.notify(&event);
        }
        Ok(())
    }

    /// Fetch one storage by id.
    pub fn get_storage(&self, id: u64) -> Result<StorageConfig, ServiceError> {
        self.storages
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(id))
    }

    /// Fetch one storage and record its probed connectivity status.
    ///
    /// This is the only operation that may take as long as a network
    /// timeout; it is never part of create, update or delete. A probe
    /// failure is captured in the status, not raised.
    pub fn get_storage_with_status(
        &self,
        id: u64,
        probe: &dyn ConnectivityProbe,
    ) -> Result<StorageConfig, ServiceError> {
        let mut storage = self.get_storage(id)?;
        let status = match self.registry.backend(storage.backend_class()) {
            Some(backend) => probe.probe(backend, storage.backend_options()),
            None => crate::config::BackendStatus::Error,
        };
        storage.set_status(status);
        Ok(storage)
    }

    /// All storages in this collection, ordered by id.
    pub fn all_storages(&self) -> Vec<StorageConfig> {
        self.storages.values().cloned().collect()
    }

    fn persist(&self) -> Result<(), ServiceError> {
        if let Some(path) = &self.storages_file {
            let stored: Vec<&StorageConfig> = self.storages.values().collect();
            let json = serde_json::to_string_pretty(&stored)?;
            fs::write(path, json)?;
        }
        Ok(())
    }

    fn notify(&self, event: &MountEvent) {
        debug!(?event, "mount lifecycle notification");
        for observer in &self.observers {
            observer(event);
        }
    }

    fn lifecycle_events(&self, storage: &StorageConfig, lifecycle: Lifecycle) -> Vec<MountEvent> {
        let path = storage.mount_point().to_owned();
        let mut targets = Vec::new();
        match &self.scope {
            ServiceScope::Personal(user) => {
                targets.push((MountType::User, vec![user.clone()]));
            }
            ServiceScope::Global => {
                if !storage.applicable_users().is_empty() {
                    targets.push((MountType::User, storage.applicable_users().to_vec()));
                }
                if !storage.applicable_groups().is_empty() {
                    targets.push((MountType::Group, storage.applicable_groups().to_vec()));
                }
                if targets.is_empty() {
                    targets.push((MountType::Global, Vec::new()));
                }
            }
        }
        targets
            .into_iter()
            .map(|(mount_type, applicable)| match lifecycle {
                Lifecycle::Created => MountEvent::Created {
                    path: path.clone(),
                    mount_type,
                    applicable,
                },
                Lifecycle::Removed => MountEvent::Removed {
                    path: path.clone(),
                    mount_type,
                    applicable,
                },
            })
            .collect()
    }
}

#[derive(Clone, Copy)]
enum Lifecycle {
    Created,
    Removed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthMechanism, NullCredentials, NULL_MECHANISM, SCHEME_NULL};
    use crate::backend::Backend;
    use crate::registry::RegistryConfig;

    fn test_registry() -> Arc<BackendRegistry> {
        let mut registry = BackendRegistry::new(RegistryConfig::default());
        registry.register_backend(Backend::new("smb", "smb", vec![]));
        registry.register_backend(Backend::new("sftp", "sftp", vec![]));
        registry.register_auth_mechanism(AuthMechanism::new(
            SCHEME_NULL,
            NULL_MECHANISM,
            "None",
            vec![],
            Arc::new(NullCredentials),
        ));
        Arc::new(registry)
    }

    fn global_service() -> StoragesService {
        StoragesService::new(test_registry(), ServiceScope::Global)
    }

    #[test]
    fn create_storage_normalizes_and_resolves() {
        let service = global_service();
        let storage = service
            .create_storage("mount", "smb", NULL_MECHANISM, OptionMap::new())
            .unwrap();
        assert_eq!(storage.mount_point(), "/mount");
        assert_eq!(storage.backend_class(), "smb");
        assert_eq!(storage.id(), None);
    }

    #[test]
    fn create_storage_rejects_unknown_classes() {
        let service = global_service();
        assert!(matches!(
            service.create_storage("mount", "nope", NULL_MECHANISM, OptionMap::new()),
            Err(ServiceError::InvalidArgument(class)) if class == "nope"
        ));
        assert!(matches!(
            service.create_storage("mount", "smb", "auth::nope", OptionMap::new()),
            Err(ServiceError::InvalidArgument(class)) if class == "auth::nope"
        ));
    }

    #[test]
    fn ids_are_assigned_monotonically_per_collection() {
        let mut global = global_service();
        let mut personal =
            StoragesService::new(test_registry(), ServiceScope::Personal("alice".into()));

        let storage = global
            .create_storage("a", "smb", NULL_MECHANISM, OptionMap::new())
            .unwrap();
        assert_eq!(global.add_storage(storage.clone()).unwrap().id(), Some(1));
        assert_eq!(global.add_storage(storage.clone()).unwrap().id(), Some(2));
        // disjoint id space
        assert_eq!(personal.add_storage(storage).unwrap().id(), Some(1));
    }

    #[test]
    fn update_requires_existing_id() {
        let mut service = global_service();
        let mut storage = service
            .create_storage("mount", "smb", NULL_MECHANISM, OptionMap::new())
            .unwrap();
        storage.set_id(255);
        assert!(matches!(
            service.update_storage(storage),
            Err(ServiceError::NotFound(255))
        ));
    }

    #[test]
    fn remove_unknown_storage_is_not_found() {
        let mut service = global_service();
        assert!(matches!(
            service.remove_storage(255),
            Err(ServiceError::NotFound(255))
        ));
    }

    #[test]
    fn personal_scope_notifies_owner() {
        let mut service =
            StoragesService::new(test_registry(), ServiceScope::Personal("alice".into()));
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&events);
        service.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let storage = service
            .create_storage("mount", "smb", NULL_MECHANISM, OptionMap::new())
            .unwrap();
        service.add_storage(storage).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![MountEvent::Created {
                path: "/mount".into(),
                mount_type: MountType::User,
                applicable: vec!["alice".into()],
            }]
        );
    }

    #[test]
    fn global_scope_notifies_per_principal_kind() {
        let mut service = global_service();
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&events);
        service.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let storage = service
            .create_storage_full(
                "mount",
                "smb",
                NULL_MECHANISM,
                OptionMap::new(),
                None,
                Some(vec!["alice".into()]),
                Some(vec!["staff".into()]),
                None,
            )
            .unwrap();
        service.add_storage(storage).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            MountEvent::Created {
                path: "/mount".into(),
                mount_type: MountType::User,
                applicable: vec!["alice".into()],
            }
        );
        assert_eq!(
            events[1],
            MountEvent::Created {
                path: "/mount".into(),
                mount_type: MountType::Group,
                applicable: vec!["staff".into()],
            }
        );
    }

    #[test]
    fn update_refires_only_on_path_or_applicability_change() {
        let mut service = global_service();
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&events);
        service.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let storage = service
            .create_storage("mount", "smb", NULL_MECHANISM, OptionMap::new())
            .unwrap();
        let mut stored = service.add_storage(storage).unwrap();
        events.lock().unwrap().clear();

        // unrelated change: no notifications
        stored.set_backend_option("host", serde_json::json!("fileserver"));
        stored = service.update_storage(stored).unwrap();
        assert!(events.lock().unwrap().is_empty());

        stored.set_mount_point("renamed");
        service.update_storage(stored).unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                MountEvent::Removed {
                    path: "/mount".into(),
                    mount_type: MountType::Global,
                    applicable: vec![],
                },
                MountEvent::Created {
                    path: "/renamed".into(),
                    mount_type: MountType::Global,
                    applicable: vec![],
                },
            ]
        );
    }
}
