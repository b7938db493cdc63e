//! Single-value type checking
//!
//! A [`TypeChecker`] resolves its kind once, at construction. Checking is split
//! into a pure core ([`TypeChecker::evaluate`]) that never fails, and thin
//! policy adapters that turn the outcome into a boolean, a value-or-default,
//! or a [`ShapeError::ValidationFailure`].

use std::fmt;

use tracing::{debug, trace};

use crate::error::{Result, ShapeError};
use crate::registry::{Kind, TypeRegistry, TypeToken};
use crate::value::{Marker, Value};

/// Kind a checker compares values against
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    /// A canonical kind from the registry
    Canonical(Kind),
    /// A class-like marker the registry does not know; checked by instance-of
    Custom(Marker),
    /// No kind matched; only values equal to this literal are accepted
    Literal(Value),
}

impl ResolvedKind {
    /// Resolve a token against the canonical table
    pub fn resolve(token: &TypeToken) -> Self {
        if let Some(entry) = TypeRegistry::global().resolve(token) {
            return ResolvedKind::Canonical(entry.kind);
        }
        match token {
            TypeToken::Marker(marker) => ResolvedKind::Custom(marker.clone()),
            TypeToken::Name(name) => {
                debug!(token = %name, "type name matches no kind, treating it as a literal");
                ResolvedKind::Literal(Value::String(name.clone()))
            }
            TypeToken::Literal(value) => ResolvedKind::Literal(value.clone()),
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        match self {
            ResolvedKind::Canonical(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedKind::Canonical(kind) => write!(f, "{}", kind),
            ResolvedKind::Custom(marker) => write!(f, "instance of {}", marker),
            ResolvedKind::Literal(value) => write!(f, "literal {}", value),
        }
    }
}

/// Options for a [`TypeChecker`]
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerOptions {
    pub kind: TypeToken,
    /// When false, a rejected value never raises and yields the default
    pub required: bool,
    pub throw_on_invalid: bool,
    /// Report a verdict instead of a value
    pub return_boolean: bool,
    pub default: Option<Value>,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            kind: TypeToken::name("any"),
            required: true,
            throw_on_invalid: true,
            return_boolean: true,
            default: None,
        }
    }
}

impl CheckerOptions {
    pub fn new(kind: impl Into<TypeToken>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn throw_on_invalid(mut self, throw: bool) -> Self {
        self.throw_on_invalid = throw;
        self
    }

    pub fn return_boolean(mut self, return_boolean: bool) -> Self {
        self.return_boolean = return_boolean;
        self
    }

    /// Set the fallback value. Null and undefined mean "no default".
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = nullish_to_none(value.into());
        self
    }

    /// Read options from a dynamic object with the keys `type`, `required`,
    /// `throwError` (or `throwOnInvalid`), `returnBoolean` and `default`.
    /// Missing keys keep the values already in `self`.
    pub fn merge_value(mut self, options: &Value) -> Result<Self> {
        let fields = options.fields().ok_or_else(|| {
            ShapeError::InvalidConfiguration(format!("checker options must be an object, got {}", options))
        })?;

        if let Some(kind) = fields.get("type").filter(|v| !v.is_undefined()) {
            self.kind = token_from_value(kind);
        }
        if let Some(required) = flag(fields.get("required"), "required")? {
            self.required = required;
        }
        let throw = fields.get("throwError").or_else(|| fields.get("throwOnInvalid"));
        if let Some(throw) = flag(throw, "throwError")? {
            self.throw_on_invalid = throw;
        }
        if let Some(return_boolean) = fields.get("returnBoolean").filter(|v| !v.is_undefined()) {
            self.return_boolean = *return_boolean == Value::Bool(true);
        }
        if let Some(default) = fields.get("default") {
            self.default = nullish_to_none(default.clone());
        }

        Ok(self)
    }

    pub fn from_value(options: &Value) -> Result<Self> {
        Self::default().merge_value(options)
    }
}

fn flag(value: Option<&Value>, key: &str) -> Result<Option<bool>> {
    match value {
        None | Some(Value::Undefined) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ShapeError::InvalidConfiguration(format!(
            "`{}` must be a boolean, got {}",
            key, other
        ))),
    }
}

fn nullish_to_none(value: Value) -> Option<Value> {
    match value {
        Value::Undefined | Value::Null => None,
        other => Some(other),
    }
}

/// Read a type token out of a dynamic value: strings are names, anything
/// else is a literal
pub fn token_from_value(value: &Value) -> TypeToken {
    match value {
        Value::String(name) => TypeToken::Name(name.clone()),
        other => TypeToken::Literal(other.clone()),
    }
}

/// Result of evaluating one value
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Value),
    /// Carries the configured default, if any
    Rejected(Option<Value>),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// The accepted value, else the default, else `Undefined`
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Accepted(value) => value,
            Outcome::Rejected(default) => default.unwrap_or_default(),
        }
    }
}

/// What [`TypeChecker::check`] produced, depending on the return mode
#[derive(Debug, Clone, PartialEq)]
pub enum Checked {
    Boolean(bool),
    Value(Value),
}

impl Checked {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Checked::Boolean(b) => Some(*b),
            Checked::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Checked::Value(value) => Some(value),
            Checked::Boolean(_) => None,
        }
    }
}

/// Validates single values against one kind
#[derive(Debug, Clone)]
pub struct TypeChecker {
    options: CheckerOptions,
    resolved: ResolvedKind,
}

impl TypeChecker {
    pub fn new(options: CheckerOptions) -> Self {
        let resolved = ResolvedKind::resolve(&options.kind);
        Self { options, resolved }
    }

    /// Build from a dynamic options object
    pub fn from_value(options: &Value) -> Result<Self> {
        Ok(Self::new(CheckerOptions::from_value(options)?))
    }

    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    pub fn resolved(&self) -> &ResolvedKind {
        &self.resolved
    }

    /// Whether the value belongs to the resolved kind. Equality with the
    /// kind itself counts only for literal kinds: `"number"` is not a number.
    pub fn matches(&self, value: &Value) -> bool {
        match &self.resolved {
            ResolvedKind::Canonical(kind) => TypeRegistry::global().entry(*kind).admits(value),
            ResolvedKind::Custom(marker) => value.instance_of(marker),
            ResolvedKind::Literal(literal) => value == literal,
        }
    }

    pub fn evaluate(&self, value: &Value) -> Outcome {
        if self.matches(value) {
            Outcome::Accepted(value.clone())
        } else {
            trace!(expected = %self.resolved, found = %value, "value rejected");
            Outcome::Rejected(self.options.default.clone())
        }
    }

    /// Boolean adapter: the verdict, or an error when throwing is enabled
    pub fn verdict(&self, value: &Value) -> Result<bool> {
        let valid = self.matches(value);
        if !valid && self.options.throw_on_invalid {
            return Err(self.failure(value));
        }
        Ok(valid)
    }

    /// Value adapter: the value when it matches, else the default. Only a
    /// required, throwing checker raises.
    pub fn project(&self, value: &Value) -> Result<Value> {
        match self.evaluate(value) {
            Outcome::Rejected(_) if self.options.required && self.options.throw_on_invalid => {
                Err(self.failure(value))
            }
            outcome => Ok(outcome.into_value()),
        }
    }

    pub fn check(&self, value: &Value) -> Result<Checked> {
        if self.options.return_boolean {
            self.verdict(value).map(Checked::Boolean)
        } else {
            self.project(value).map(Checked::Value)
        }
    }

    /// Check each value in order. The first raised failure is returned.
    pub fn check_all<'v>(&self, values: impl IntoIterator<Item = &'v Value>) -> Result<Vec<Checked>> {
        values.into_iter().map(|value| self.check(value)).collect()
    }

    fn failure(&self, value: &Value) -> ShapeError {
        ShapeError::ValidationFailure {
            expected: self.resolved.to_string(),
            found: TypeRegistry::global().describe(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Instance;
    use serde_json::json;

    fn checker(kind: &str) -> TypeChecker {
        TypeChecker::new(CheckerOptions::new(kind).throw_on_invalid(false))
    }

    #[test]
    fn test_primitive_kinds_accept_matching_values() {
        let samples = [
            ("any", Value::Null),
            ("array", Value::from(json!([1, 2]))),
            ("bigint", Value::BigInt(10)),
            ("boolean", Value::Bool(false)),
            ("function", Value::Function("handler".into())),
            ("number", Value::from(4.5)),
            ("object", Value::from(json!({"a": 1}))),
            ("string", Value::from("text")),
            ("symbol", Value::Symbol("id".into())),
            ("error", Value::error("boom")),
            ("url", Value::url("https://example.com")),
        ];
        for (kind, value) in samples {
            assert!(checker(kind).check(&value).unwrap().as_bool().unwrap(), "{} should accept {}", kind, value);
        }
    }

    #[test]
    fn test_object_and_array_are_distinct() {
        assert!(!checker("object").matches(&Value::from(json!([]))));
        assert!(!checker("object").matches(&Value::Null));
        assert!(checker("object").matches(&Value::error("boom")));
        assert!(checker("object").matches(&Value::url("https://example.com")));
        assert!(!checker("array").matches(&Value::from(json!({}))));
        assert!(!checker("number").matches(&Value::from("5")));
    }

    #[test]
    fn test_kind_name_is_not_a_member() {
        assert!(!checker("number").matches(&Value::from("number")));
        assert!(!checker("string").matches(&Value::from("number")));
        assert!(checker("string").matches(&Value::from("string")));
        assert!(!checker("boolean").matches(&Value::from("boolean")));

        let literal = TypeChecker::new(CheckerOptions::new(TypeToken::Literal(Value::from(42))));
        assert!(literal.matches(&Value::from(42)));
        assert!(!literal.matches(&Value::from(41)));
    }

    #[test]
    fn test_unknown_name_is_literal() {
        let c = checker("widget");
        assert_eq!(c.resolved(), &ResolvedKind::Literal(Value::from("widget")));
        assert!(c.matches(&Value::from("widget")));
        assert!(!c.matches(&Value::from("gadget")));
    }

    #[test]
    fn test_custom_marker_uses_instance_of() {
        let user = Marker::new("User");
        let c = TypeChecker::new(CheckerOptions::new(user.clone()));
        let admin = Value::Instance(Instance::new(Marker::new("Admin")).extends(user));
        assert!(c.matches(&admin));
        assert!(!c.matches(&Value::from(json!({"name": "x"}))));
    }

    #[test]
    fn test_boolean_mode_throws_when_enabled() {
        let c = TypeChecker::new(CheckerOptions::new("number"));
        let err = c.check(&Value::from("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert_eq!(c.check(&Value::from(1)).unwrap(), Checked::Boolean(true));
    }

    #[test]
    fn test_optional_value_mode_never_throws() {
        let c = TypeChecker::new(
            CheckerOptions::new("number")
                .required(false)
                .return_boolean(false)
                .default_value(7),
        );
        assert_eq!(c.check(&Value::from("x")).unwrap(), Checked::Value(Value::from(7)));
        assert_eq!(c.check(&Value::from(2)).unwrap(), Checked::Value(Value::from(2)));
    }

    #[test]
    fn test_required_value_mode() {
        let strict = TypeChecker::new(CheckerOptions::new("string").return_boolean(false));
        assert!(strict.check(&Value::from(1)).is_err());

        let lenient = TypeChecker::new(
            CheckerOptions::new("string")
                .return_boolean(false)
                .throw_on_invalid(false),
        );
        assert_eq!(lenient.check(&Value::from(1)).unwrap(), Checked::Value(Value::Undefined));
    }

    #[test]
    fn test_check_all_preserves_order() {
        let c = checker("string");
        let values = [Value::from("a"), Value::from(1), Value::from("b")];
        let results: Vec<bool> = c
            .check_all(&values)
            .unwrap()
            .into_iter()
            .filter_map(|r| r.as_bool())
            .collect();
        assert_eq!(results, vec![true, false, true]);
    }

    #[test]
    fn test_options_from_value() {
        let opts = CheckerOptions::from_value(&Value::from(json!({
            "type": "string",
            "required": false,
            "throwError": false,
            "returnBoolean": false,
            "default": "anon"
        })))
        .unwrap();
        assert_eq!(opts.kind, TypeToken::name("string"));
        assert!(!opts.required && !opts.throw_on_invalid && !opts.return_boolean);
        assert_eq!(opts.default, Some(Value::from("anon")));
    }

    #[test]
    fn test_malformed_options_are_rejected() {
        let not_object = TypeChecker::from_value(&Value::from("number")).unwrap_err();
        assert_eq!(not_object.kind(), ErrorKind::InvalidConfiguration);

        let bad_flag = TypeChecker::from_value(&Value::from(json!({"type": "number", "required": "yes"})));
        assert!(matches!(bad_flag, Err(ShapeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_null_default_means_none() {
        let opts = CheckerOptions::new("number").default_value(Value::Null);
        assert_eq!(opts.default, None);
    }
}
