//! Mount resolution: from configured storages to concrete mount points.
//!
//! For a given user the resolver unions the personal collection with the
//! applicable global storages and materializes each into a
//! [`ResolvedMount`]: the auth mechanism gets exactly one chance to inject
//! credentials, object-store descriptors are instantiated into live
//! handles, and the mount path is anchored under the user's files root.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{OptionMap, StorageConfig};
use crate::registry::BackendRegistry;
use crate::service::StoragesService;

/// Backend option key holding an object-store factory descriptor.
const OBJECTSTORE_OPTION: &str = "objectstore";

/// A live object-store handle, ready to be handed to a backend driver.
///
/// Deliberately opaque: drivers downcast or wrap as they see fit.
pub trait ObjectStore: Send + Sync {
    /// Class id of the factory that built this handle.
    fn class_id(&self) -> &str;
}

/// Builds an [`ObjectStore`] handle from its configuration descriptor.
pub type ObjectStoreFactory =
    Arc<dyn Fn(&OptionMap) -> Result<Arc<dyn ObjectStore>, ResolverError> + Send + Sync>;

/// Registry of object-store factories, keyed by class id.
///
/// An `objectstore` backend option is one level of indirection: the
/// configuration describes how to build a dependency, not the dependency
/// itself. Factories registered here perform that construction.
#[derive(Default, Clone)]
pub struct ObjectStoreRegistry {
    factories: BTreeMap<String, ObjectStoreFactory>,
}

impl ObjectStoreRegistry {
    /// Create an empty factory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for the given object-store class id.
    pub fn register(&mut self, class_id: impl Into<String>, factory: ObjectStoreFactory) {
        self.factories.insert(class_id.into(), factory);
    }

    fn build(&self, descriptor: &OptionMap) -> Result<Arc<dyn ObjectStore>, ResolverError> {
        let class = descriptor
            .get("class")
            .and_then(Value::as_str)
            .ok_or(ResolverError::MalformedObjectStore)?;
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| ResolverError::UnknownObjectStoreClass(class.to_owned()))?;
        factory(descriptor)
    }
}

/// Failure while resolving storages into mount points.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A storage references an auth mechanism the registry does not know.
    #[error("unknown auth mechanism \"{0}\"")]
    UnknownAuthMechanism(String),
    /// An `objectstore` option is present but carries no `class` key.
    #[error("objectstore option has no class")]
    MalformedObjectStore,
    /// No factory is registered for the descriptor's class.
    #[error("unknown objectstore class \"{0}\"")]
    UnknownObjectStoreClass(String),
    /// A factory failed to construct its handle.
    #[error("objectstore construction failed: {0}")]
    ObjectStoreConstruction(String),
}

/// One concrete mount point for a user.
#[derive(Clone)]
pub struct ResolvedMount {
    storage_class: String,
    mount_point: String,
    backend_options: OptionMap,
    mount_options: OptionMap,
    object_store: Option<Arc<dyn ObjectStore>>,
    personal: bool,
}

impl fmt::Debug for ResolvedMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMount")
            .field("storage_class", &self.storage_class)
            .field("mount_point", &self.mount_point)
            .field("personal", &self.personal)
            .field("has_object_store", &self.object_store.is_some())
            .finish_non_exhaustive()
    }
}

impl ResolvedMount {
    /// Class id of the backend driver to instantiate.
    pub fn storage_class(&self) -> &str {
        &self.storage_class
    }

    /// Absolute mount path: `/{user}/files{configured mount point}`.
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Backend options after credential injection.
    pub fn backend_options(&self) -> &OptionMap {
        &self.backend_options
    }

    /// Mount options (e.g. `priority`).
    pub fn mount_options(&self) -> &OptionMap {
        &self.mount_options
    }

    /// Instantiated object-store handle, if the storage configured one.
    pub fn object_store(&self) -> Option<&Arc<dyn ObjectStore>> {
        self.object_store.as_ref()
    }

    /// Whether this mount came from the user's personal collection.
    /// Personal mounts shadow global ones at the same path at the
    /// filesystem layer (last registered wins there, not here).
    pub fn is_personal(&self) -> bool {
        self.personal
    }
}

/// Resolves all storages applicable to a user into mount descriptors.
pub struct MountResolver {
    registry: Arc<BackendRegistry>,
    object_stores: ObjectStoreRegistry,
}

impl MountResolver {
    /// Create a resolver over the given registry with no object-store
    /// factories.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            object_stores: ObjectStoreRegistry::new(),
        }
    }

    /// Create a resolver with the given object-store factories.
    pub fn with_object_stores(
        registry: Arc<BackendRegistry>,
        object_stores: ObjectStoreRegistry,
    ) -> Self {
        Self {
            registry,
            object_stores,
        }
    }

    /// Resolve every mount applicable to `user` (member of `groups`):
    /// the user's personal storages plus the global storages whose
    /// applicability lists include the user or one of the groups, or are
    /// empty (meaning "all"). Auth-mechanism manipulation runs exactly
    /// once per storage, here and never earlier.
    ///
    /// Global mounts come first, ordered by priority (configured priority,
    /// falling back to the backend's), then personal mounts, so that a
    /// last-registered-wins filesystem layer lets personal mounts shadow
    /// global ones.
    pub fn mounts_for_user(
        &self,
        user: &str,
        groups: &[String],
        personal: &StoragesService,
        global: &StoragesService,
    ) -> Result<Vec<ResolvedMount>, ResolverError> {
        let mut applicable: Vec<StorageConfig> = global
            .all_storages()
            .into_iter()
            .filter(|storage| is_applicable(storage, user, groups))
            .collect();
        applicable.sort_by_key(|storage| self.effective_priority(storage));

        let mut mounts = Vec::new();
        for storage in applicable {
            mounts.push(self.prepare(storage, user, false)?);
        }
        for storage in personal.all_storages() {
            mounts.push(self.prepare(storage, user, true)?);
        }
        debug!(user, count = mounts.len(), "resolved mounts");
        Ok(mounts)
    }

    fn effective_priority(&self, storage: &StorageConfig) -> i32 {
        storage.priority().unwrap_or_else(|| {
            self.registry
                .backend(storage.backend_class())
                .map_or(crate::backend::PRIORITY_DEFAULT, |backend| {
                    backend.priority()
                })
        })
    }

    fn prepare(
        &self,
        mut storage: StorageConfig,
        user: &str,
        personal: bool,
    ) -> Result<ResolvedMount, ResolverError> {
        let object_store = match storage.remove_backend_option(OBJECTSTORE_OPTION) {
            Some(Value::Object(descriptor)) => {
                let descriptor: OptionMap = descriptor.into_iter().collect();
                Some(self.object_stores.build(&descriptor)?)
            }
            Some(_) => return Err(ResolverError::MalformedObjectStore),
            None => None,
        };

        let mechanism = self
            .registry
            .auth_mechanism(storage.auth_mechanism_class())
            .ok_or_else(|| {
                ResolverError::UnknownAuthMechanism(storage.auth_mechanism_class().to_owned())
            })?;
        mechanism.manipulate_storage(&mut storage);

        Ok(ResolvedMount {
            storage_class: storage.backend_class().to_owned(),
            mount_point: format!("/{user}/files{}", storage.mount_point()),
            backend_options: storage.backend_options().clone(),
            mount_options: storage.mount_options().clone(),
            object_store,
            personal,
        })
    }
}

fn is_applicable(storage: &StorageConfig, user: &str, groups: &[String]) -> bool {
    if storage.applicable_users().is_empty() && storage.applicable_groups().is_empty() {
        return true;
    }
    if storage.applicable_users().iter().any(|u| u == user) {
        return true;
    }
    storage
        .applicable_groups()
        .iter()
        .any(|g| groups.contains(g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        AuthMechanism, CredentialSource, NullCredentials, NULL_MECHANISM, SCHEME_NULL,
    };
    use crate::backend::Backend;
    use crate::config::OptionMap;
    use crate::registry::{BackendRegistry, RegistryConfig};
    use crate::service::ServiceScope;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCredentials(Arc<AtomicUsize>);

    impl CredentialSource for CountingCredentials {
        fn manipulate_storage(&self, storage: &mut StorageConfig) {
            self.0.fetch_add(1, Ordering::SeqCst);
            storage.set_backend_option("token", json!("injected"));
        }
    }

    fn registry_with_counter(counter: Arc<AtomicUsize>) -> Arc<BackendRegistry> {
        let mut registry = BackendRegistry::new(RegistryConfig::default());
        registry.register_backend(Backend::new("smb", "SMB / CIFS", vec![]));
        registry.register_auth_mechanism(AuthMechanism::new(
            SCHEME_NULL,
            NULL_MECHANISM,
            "None",
            vec![],
            Arc::new(CountingCredentials(counter)),
        ));
        Arc::new(registry)
    }

    fn storage(
        service: &StoragesService,
        mount_point: &str,
        users: Vec<String>,
        groups: Vec<String>,
    ) -> StorageConfig {
        service
            .create_storage_full(
                mount_point,
                "smb",
                NULL_MECHANISM,
                OptionMap::new(),
                None,
                Some(users),
                Some(groups),
                None,
            )
            .unwrap()
    }

    #[test]
    fn unions_personal_and_applicable_global_storages() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(Arc::clone(&counter));
        let mut global = StoragesService::new(Arc::clone(&registry), ServiceScope::Global);
        let mut personal = StoragesService::new(
            Arc::clone(&registry),
            ServiceScope::Personal("alice".into()),
        );

        // for everyone
        let all = storage(&global, "everyone", vec![], vec![]);
        global.add_storage(all).unwrap();
        // for alice
        let for_alice = storage(&global, "alice-only", vec!["alice".into()], vec![]);
        global.add_storage(for_alice).unwrap();
        // for the staff group
        let for_staff = storage(&global, "staff", vec![], vec!["staff".into()]);
        global.add_storage(for_staff).unwrap();
        // for somebody else
        let for_bob = storage(&global, "bob-only", vec!["bob".into()], vec![]);
        global.add_storage(for_bob).unwrap();
        // personal
        let own = storage(&personal, "own", vec![], vec![]);
        personal.add_storage(own).unwrap();

        let resolver = MountResolver::new(registry);
        let mounts = resolver
            .mounts_for_user("alice", &["staff".into()], &personal, &global)
            .unwrap();

        let paths: Vec<&str> = mounts.iter().map(ResolvedMount::mount_point).collect();
        assert_eq!(
            paths,
            vec![
                "/alice/files/everyone",
                "/alice/files/alice-only",
                "/alice/files/staff",
                "/alice/files/own",
            ]
        );
        assert!(mounts.last().unwrap().is_personal());
        assert!(!mounts[0].is_personal());
        // manipulate_storage ran exactly once per resolved mount
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert!(mounts
            .iter()
            .all(|mount| mount.backend_options()["token"] == json!("injected")));
    }

    #[test]
    fn global_mounts_order_by_priority() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(counter);
        let mut global = StoragesService::new(Arc::clone(&registry), ServiceScope::Global);
        let personal = StoragesService::new(
            Arc::clone(&registry),
            ServiceScope::Personal("alice".into()),
        );

        let mut low = storage(&global, "low", vec![], vec![]);
        low.set_priority(200);
        global.add_storage(low).unwrap();
        let mut high = storage(&global, "high", vec![], vec![]);
        high.set_priority(10);
        global.add_storage(high).unwrap();

        let resolver = MountResolver::new(registry);
        let mounts = resolver
            .mounts_for_user("alice", &[], &personal, &global)
            .unwrap();
        let paths: Vec<&str> = mounts.iter().map(ResolvedMount::mount_point).collect();
        assert_eq!(paths, vec!["/alice/files/high", "/alice/files/low"]);
    }

    #[test]
    fn objectstore_descriptor_is_instantiated() {
        struct FakeStore;
        impl ObjectStore for FakeStore {
            fn class_id(&self) -> &str {
                "objectstore::swift"
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(counter);
        let mut global = StoragesService::new(Arc::clone(&registry), ServiceScope::Global);
        let personal = StoragesService::new(
            Arc::clone(&registry),
            ServiceScope::Personal("alice".into()),
        );

        let mut configured = storage(&global, "objects", vec![], vec![]);
        configured.set_backend_option(
            "objectstore",
            json!({"class": "objectstore::swift", "container": "files"}),
        );
        global.add_storage(configured).unwrap();

        let mut factories = ObjectStoreRegistry::new();
        factories.register(
            "objectstore::swift",
            Arc::new(|descriptor: &OptionMap| {
                assert_eq!(descriptor["container"], json!("files"));
                Ok(Arc::new(FakeStore) as Arc<dyn ObjectStore>)
            }),
        );

        let resolver = MountResolver::with_object_stores(registry, factories);
        let mounts = resolver
            .mounts_for_user("alice", &[], &personal, &global)
            .unwrap();
        assert_eq!(mounts.len(), 1);
        let store = mounts[0].object_store().unwrap();
        assert_eq!(store.class_id(), "objectstore::swift");
        // the descriptor does not leak into the driver options
        assert!(mounts[0].backend_options().get("objectstore").is_none());
    }

    #[test]
    fn unknown_objectstore_class_is_an_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(counter);
        let mut global = StoragesService::new(Arc::clone(&registry), ServiceScope::Global);
        let personal = StoragesService::new(
            Arc::clone(&registry),
            ServiceScope::Personal("alice".into()),
        );

        let mut configured = storage(&global, "objects", vec![], vec![]);
        configured.set_backend_option("objectstore", json!({"class": "objectstore::unknown"}));
        global.add_storage(configured).unwrap();

        let resolver = MountResolver::new(registry);
        let result = resolver.mounts_for_user("alice", &[], &personal, &global);
        assert!(matches!(
            result,
            Err(ResolverError::UnknownObjectStoreClass(class)) if class == "objectstore::unknown"
        ));
    }
}
