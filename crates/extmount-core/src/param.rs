//! Configuration parameters for backends and authentication mechanisms.
//!
//! A [`Parameter`] describes one configuration field: its stable name (the
//! key under which a value is stored in a storage's backend options), a
//! human-readable label, a value kind and optional flags. Parameters are
//! built fluently and are immutable once their owner is registered.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// The kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    /// Plain text input.
    #[default]
    Text,
    /// Sensitive text input, masked in user interfaces.
    Password,
    /// Boolean toggle.
    Boolean,
    /// Populated programmatically (e.g. OAuth tokens), never shown to or
    /// required from the end user.
    Hidden,
}

/// Error returned when parsing an unknown parameter kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseParameterKindError(String);

impl fmt::Display for ParseParameterKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown parameter kind: {}", self.0)
    }
}

impl std::error::Error for ParseParameterKindError {}

impl FromStr for ParameterKind {
    type Err = ParseParameterKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ParameterKind::Text),
            "password" => Ok(ParameterKind::Password),
            "boolean" => Ok(ParameterKind::Boolean),
            "hidden" => Ok(ParameterKind::Hidden),
            _ => Err(ParseParameterKindError(s.to_owned())),
        }
    }
}

impl ParameterKind {
    /// Wire name of this kind, as used in serialized descriptors.
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKind::Text => "text",
            ParameterKind::Password => "password",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Hidden => "hidden",
        }
    }
}

bitflags::bitflags! {
    /// Behavioral flags of a parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParameterFlags: u32 {
        /// The parameter may be left empty.
        const OPTIONAL = 1;
    }
}

/// One configuration field of a backend or authentication mechanism.
///
/// The `name` is the stable key into a storage's backend-options map; the
/// label is presentation-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    label: String,
    kind: ParameterKind,
    flags: ParameterFlags,
}

impl Parameter {
    /// Create a text parameter with the given name and display label.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Text,
            flags: ParameterFlags::empty(),
        }
    }

    /// Set the value kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a flag.
    #[must_use]
    pub fn with_flag(mut self, flag: ParameterFlags) -> Self {
        self.flags |= flag;
        self
    }

    /// The stable option-map key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The value kind.
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    /// The flags set on this parameter.
    pub fn flags(&self) -> ParameterFlags {
        self.flags
    }

    /// Whether the parameter may be left empty.
    pub fn is_optional(&self) -> bool {
        self.flags.contains(ParameterFlags::OPTIONAL)
    }

    /// Validate a supplied value against this parameter's kind and flags.
    ///
    /// An absent or empty value fails unless the parameter is optional.
    /// Hidden parameters are exempt from absence checks since they are
    /// populated programmatically. Boolean parameters accept JSON booleans
    /// and boolean-ish strings; text and password parameters accept any
    /// non-empty string.
    ///
    /// Pure function of the parameter definition and the supplied value.
    pub fn validate_value(&self, value: Option<&Value>) -> bool {
        if is_empty_value(value) {
            return self.is_optional() || self.kind == ParameterKind::Hidden;
        }
        // value is guaranteed present and non-empty here
        let value = value.unwrap_or(&Value::Null);
        match self.kind {
            ParameterKind::Boolean => is_boolean_ish(value),
            ParameterKind::Text | ParameterKind::Password | ParameterKind::Hidden => true,
        }
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn is_boolean_ish(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n == 0 || n == 1),
        _ => false,
    }
}

/// Serializes into the UI descriptor consumed by the administrative
/// front-end: `{"label": ..., "type": ..., "optional": ...}`.
impl Serialize for Parameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("type", self.kind.as_str())?;
        map.serialize_entry("optional", &self.is_optional())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn required_parameter_rejects_absent_and_empty() {
        let param = Parameter::new("host", "Host");
        assert!(!param.validate_value(None));
        assert!(!param.validate_value(Some(&Value::Null)));
        assert!(!param.validate_value(Some(&json!(""))));
        assert!(param.validate_value(Some(&json!("example.org"))));
    }

    #[test]
    fn optional_parameter_accepts_absent() {
        let param = Parameter::new("root", "Remote subfolder").with_flag(ParameterFlags::OPTIONAL);
        assert!(param.validate_value(None));
        assert!(param.validate_value(Some(&json!(""))));
        assert!(param.validate_value(Some(&json!("sub/dir"))));
    }

    #[test]
    fn hidden_parameter_exempt_from_absence_check() {
        let param = Parameter::new("token", "token").with_kind(ParameterKind::Hidden);
        assert!(param.validate_value(None));
        assert!(param.validate_value(Some(&json!("abc"))));
    }

    #[test]
    fn boolean_parameter_accepts_boolean_ish_values() {
        let param = Parameter::new("secure", "Secure https://").with_kind(ParameterKind::Boolean);
        assert!(param.validate_value(Some(&json!(true))));
        assert!(param.validate_value(Some(&json!(false))));
        assert!(param.validate_value(Some(&json!("true"))));
        assert!(param.validate_value(Some(&json!("0"))));
        assert!(param.validate_value(Some(&json!(1))));
        assert!(!param.validate_value(Some(&json!("maybe"))));
        assert!(!param.validate_value(Some(&json!(42))));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ParameterKind::Text,
            ParameterKind::Password,
            ParameterKind::Boolean,
            ParameterKind::Hidden,
        ] {
            assert_eq!(kind.as_str().parse::<ParameterKind>().unwrap(), kind);
        }
        assert!("blob".parse::<ParameterKind>().is_err());
    }

    #[test]
    fn serializes_as_ui_descriptor() {
        let param = Parameter::new("secret", "Secret Key")
            .with_kind(ParameterKind::Password)
            .with_flag(ParameterFlags::OPTIONAL);
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(
            json,
            json!({"label": "Secret Key", "type": "password", "optional": true})
        );
    }

    proptest! {
        /// Any non-empty string satisfies a required text or password
        /// parameter; the empty string never does.
        #[test]
        fn nonempty_strings_satisfy_required_text(value in ".+") {
            let text = Parameter::new("p", "p");
            let password = Parameter::new("p", "p").with_kind(ParameterKind::Password);
            prop_assert!(text.validate_value(Some(&Value::String(value.clone()))));
            prop_assert!(password.validate_value(Some(&Value::String(value))));
        }

        /// Optional parameters accept every value a required parameter of
        /// the same kind accepts, plus absence.
        #[test]
        fn optional_is_weaker_than_required(value in prop::option::of(".*")) {
            let required = Parameter::new("p", "p");
            let optional = Parameter::new("p", "p").with_flag(ParameterFlags::OPTIONAL);
            let value = value.map(Value::String);
            if required.validate_value(value.as_ref()) {
                prop_assert!(optional.validate_value(value.as_ref()));
            }
        }
    }
}
