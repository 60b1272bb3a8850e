//! The shipped catalog of storage backends and authentication mechanisms.
//!
//! Drivers themselves are opaque; each registration only describes a
//! backend's configuration schema, auth schemes, visibility and runtime
//! prerequisites. Dependency checks probe for the helper binaries the
//! drivers shell out to.

use std::env;
use std::sync::Arc;

use crate::auth::{
    AuthMechanism, BasicCredentials, NullCredentials, NULL_MECHANISM, PASSWORD_MECHANISM,
    SCHEME_PASSWORD,
};
use crate::backend::{Backend, PRIORITY_DEFAULT};
use crate::dependency::{DependencyCheck, DependencyCheckResult};
use crate::param::{Parameter, ParameterFlags, ParameterKind};
use crate::registry::BackendRegistry;
use crate::visibility::Visibility;

/// Register the shipped authentication mechanisms.
pub fn register_auth_mechanisms(registry: &mut BackendRegistry) {
    registry.register_auth_mechanism(AuthMechanism::new(
        crate::auth::SCHEME_NULL,
        NULL_MECHANISM,
        "None",
        vec![],
        Arc::new(NullCredentials),
    ));

    registry.register_auth_mechanism(AuthMechanism::new(
        SCHEME_PASSWORD,
        PASSWORD_MECHANISM,
        "Username and password",
        vec![
            Parameter::new("user", "Username"),
            Parameter::new("password", "Password").with_kind(ParameterKind::Password),
        ],
        Arc::new(BasicCredentials),
    ));
}

/// Register the shipped storage backends.
pub fn register_backends(registry: &mut BackendRegistry) {
    registry.register_backend(
        Backend::new(
            "local",
            "Local",
            vec![Parameter::new("datadir", "Location")],
        )
        .with_allowed_visibility(Visibility::ADMIN)
        .with_priority(PRIORITY_DEFAULT + 50),
    );

    registry.register_backend(
        Backend::new(
            "amazons3",
            "Amazon S3",
            vec![
                Parameter::new("key", "Access Key"),
                Parameter::new("secret", "Secret Key").with_kind(ParameterKind::Password),
                Parameter::new("bucket", "Bucket"),
                Parameter::new("hostname", "Hostname").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("port", "Port").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("region", "Region").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("use_ssl", "Enable SSL").with_kind(ParameterKind::Boolean),
                Parameter::new("use_path_style", "Enable Path Style")
                    .with_kind(ParameterKind::Boolean),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"])),
    );

    registry.register_backend(
        Backend::new(
            "dropbox",
            "Dropbox",
            vec![
                Parameter::new("configured", "configured").with_kind(ParameterKind::Hidden),
                Parameter::new("app_key", "App key"),
                Parameter::new("app_secret", "App secret").with_kind(ParameterKind::Password),
                Parameter::new("token", "token").with_kind(ParameterKind::Hidden),
                Parameter::new("token_secret", "token_secret").with_kind(ParameterKind::Hidden),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"]))
        .with_custom_js("dropbox"),
    );

    registry.register_backend(
        Backend::new(
            "ftp",
            "FTP",
            vec![
                Parameter::new("host", "Host"),
                Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("secure", "Secure ftps://").with_kind(ParameterKind::Boolean),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"]))
        .with_auth_scheme(SCHEME_PASSWORD)
        .with_legacy_auth_mechanism(PASSWORD_MECHANISM),
    );

    registry.register_backend(
        Backend::new(
            "googledrive",
            "Google Drive",
            vec![
                Parameter::new("configured", "configured").with_kind(ParameterKind::Hidden),
                Parameter::new("client_id", "Client ID"),
                Parameter::new("client_secret", "Client secret")
                    .with_kind(ParameterKind::Password),
                Parameter::new("token", "token").with_kind(ParameterKind::Hidden),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"]))
        .with_custom_js("google"),
    );

    registry.register_backend(
        Backend::new(
            "swift",
            "OpenStack Object Storage",
            vec![
                Parameter::new("user", "Username"),
                Parameter::new("bucket", "Bucket"),
                Parameter::new("region", "Region (optional for OpenStack Object Storage)")
                    .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("key", "API Key (required for Rackspace Cloud Files)")
                    .with_kind(ParameterKind::Password)
                    .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("tenant", "Tenantname (required for OpenStack Object Storage)")
                    .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("password", "Password (required for OpenStack Object Storage)")
                    .with_kind(ParameterKind::Password)
                    .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new(
                    "service_name",
                    "Service Name (required for OpenStack Object Storage)",
                )
                .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new(
                    "url",
                    "URL of identity endpoint (required for OpenStack Object Storage)",
                )
                .with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("timeout", "Timeout of HTTP requests in seconds")
                    .with_flag(ParameterFlags::OPTIONAL),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"])),
    );

    // SMB drivers shell out to smbclient, which has no Windows build
    if !cfg!(windows) {
        registry.register_backend(
            Backend::new(
                "smb",
                "SMB / CIFS",
                vec![
                    Parameter::new("host", "Host"),
                    Parameter::new("share", "Share"),
                    Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
                ],
            )
            .with_dependency_check(require_binaries(&["smbclient"]))
            .with_auth_scheme(SCHEME_PASSWORD)
            .with_legacy_auth_mechanism(PASSWORD_MECHANISM),
        );

        registry.register_backend(
            Backend::new(
                "smb_oc",
                "SMB / CIFS using server login",
                vec![
                    Parameter::new("host", "Host"),
                    Parameter::new("username_as_share", "Username as share")
                        .with_kind(ParameterKind::Boolean),
                    Parameter::new("share", "Share").with_flag(ParameterFlags::OPTIONAL),
                    Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
                ],
            )
            .with_dependency_check(require_binaries(&["smbclient"]))
            .with_priority(PRIORITY_DEFAULT - 10),
        );
    }

    registry.register_backend(
        Backend::new(
            "dav",
            "WebDAV",
            vec![
                Parameter::new("host", "URL"),
                Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("secure", "Secure https://").with_kind(ParameterKind::Boolean),
            ],
        )
        .with_dependency_check(require_binaries(&["curl"]))
        .with_auth_scheme(SCHEME_PASSWORD)
        .with_legacy_auth_mechanism(PASSWORD_MECHANISM),
    );

    registry.register_backend(
        Backend::new(
            "owncloud",
            "ownCloud",
            vec![
                Parameter::new("host", "URL"),
                Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
                Parameter::new("secure", "Secure https://").with_kind(ParameterKind::Boolean),
            ],
        )
        .with_auth_scheme(SCHEME_PASSWORD)
        .with_legacy_auth_mechanism(PASSWORD_MECHANISM),
    );

    registry.register_backend(
        Backend::new(
            "sftp",
            "SFTP",
            vec![
                Parameter::new("host", "Host"),
                Parameter::new("root", "Root").with_flag(ParameterFlags::OPTIONAL),
            ],
        )
        .with_auth_scheme(SCHEME_PASSWORD)
        .with_legacy_auth_mechanism(PASSWORD_MECHANISM),
    );

    registry.register_backend(
        Backend::new(
            "sftp_key",
            "SFTP with secret key login",
            vec![
                Parameter::new("host", "Host"),
                Parameter::new("user", "Username"),
                Parameter::new("public_key", "Public key"),
                Parameter::new("private_key", "private_key").with_kind(ParameterKind::Hidden),
                Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL),
            ],
        )
        .with_custom_js("sftp_key"),
    );
}

/// Dependency check that requires each named binary to be on `PATH`.
fn require_binaries(binaries: &'static [&'static str]) -> DependencyCheck {
    Arc::new(move || {
        let missing: Vec<(String, String)> = binaries
            .iter()
            .filter(|binary| !binary_in_path(binary))
            .map(|binary| {
                (
                    (*binary).to_owned(),
                    format!("The {binary} binary was not found on PATH."),
                )
            })
            .collect();
        if missing.is_empty() {
            DependencyCheckResult::Satisfied
        } else {
            DependencyCheckResult::MissingWithMessages(missing)
        }
    })
}

fn binary_in_path(binary: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| {
        let candidate = dir.join(binary);
        candidate.is_file()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;

    fn populated_registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new(RegistryConfig::default());
        register_backends(&mut registry);
        register_auth_mechanisms(&mut registry);
        registry
    }

    #[test]
    fn catalog_registers_expected_backends() {
        let registry = populated_registry();
        for class in [
            "local",
            "amazons3",
            "dropbox",
            "ftp",
            "googledrive",
            "swift",
            "dav",
            "owncloud",
            "sftp",
            "sftp_key",
        ] {
            assert!(registry.backend(class).is_some(), "missing {class}");
        }
        assert_eq!(registry.backend("smb").is_some(), !cfg!(windows));
    }

    #[test]
    fn local_backend_is_admin_only_and_high_priority() {
        let registry = populated_registry();
        let local = registry.backend("local").unwrap();
        assert!(!local.is_allowed_visible_for(Visibility::PERSONAL));
        assert!(local.is_visible_for(Visibility::ADMIN));
        assert_eq!(local.priority(), PRIORITY_DEFAULT + 50);
    }

    #[test]
    fn password_backends_declare_the_scheme_and_legacy_fallback() {
        let registry = populated_registry();
        for class in ["ftp", "dav", "owncloud", "sftp"] {
            let backend = registry.backend(class).unwrap();
            assert!(backend.auth_schemes().contains(SCHEME_PASSWORD), "{class}");
            assert_eq!(backend.legacy_auth_mechanism_class(), PASSWORD_MECHANISM);
        }
        // no declared scheme: implicit null
        let sftp_key = registry.backend("sftp_key").unwrap();
        assert!(sftp_key.auth_schemes().contains(crate::auth::SCHEME_NULL));
        assert_eq!(sftp_key.legacy_auth_mechanism_class(), NULL_MECHANISM);
    }

    #[test]
    fn both_shipped_mechanisms_are_registered() {
        let registry = populated_registry();
        let null = registry.auth_mechanism(NULL_MECHANISM).unwrap();
        assert_eq!(null.scheme(), crate::auth::SCHEME_NULL);
        assert!(null.parameters().is_empty());

        let basic = registry.auth_mechanism(PASSWORD_MECHANISM).unwrap();
        assert_eq!(basic.scheme(), SCHEME_PASSWORD);
        assert_eq!(basic.parameters().len(), 2);
    }

    #[test]
    fn require_binaries_reports_missing_with_message() {
        let check = require_binaries(&["definitely-not-a-real-binary-9f3a"]);
        match check() {
            DependencyCheckResult::MissingWithMessages(missing) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].0, "definitely-not-a-real-binary-9f3a");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
