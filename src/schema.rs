//! Schemas: compiled, reusable object validators
//!
//! A [`Schema`] is built once from a field-by-field description. Every field
//! gets two [`TypeChecker`]s sharing kind, policy and default: one returns a
//! verdict, the other a value-or-default. A single pass over an instance
//! therefore yields both the overall verdict and a sanitized projection.
//!
//! ```text
//! { age: "number", tags: ["string"], name: { type: "string", required: false, default: "anon" } }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::checker::{CheckerOptions, TypeChecker};
use crate::error::{Result, ShapeError};
use crate::registry::{Kind, TypeRegistry, TypeToken};
use crate::value::{Map, Value};

/// Shape of [`Schema::check`]'s output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    #[default]
    Boolean,
    Value,
    All,
}

impl ReturnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnMode::Boolean => "boolean",
            ReturnMode::Value => "value",
            ReturnMode::All => "all",
        }
    }

    /// Parse a mode name, falling back to `Boolean` for anything unknown
    pub fn parse_lenient(mode: &str) -> Self {
        mode.parse().unwrap_or_default()
    }
}

impl FromStr for ReturnMode {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(ReturnMode::Boolean),
            "value" => Ok(ReturnMode::Value),
            "all" => Ok(ReturnMode::All),
            _ => Err(ShapeError::UnknownReturnMode(s.to_string())),
        }
    }
}

impl fmt::Display for ReturnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full options for one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    pub kind: TypeToken,
    pub required: bool,
    pub throw_on_invalid: bool,
    pub is_array: bool,
    pub default: Option<Value>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            kind: TypeToken::name("any"),
            required: true,
            throw_on_invalid: false,
            is_array: false,
            default: None,
        }
    }
}

impl FieldOptions {
    pub fn new(kind: impl Into<TypeToken>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn throw_on_invalid(mut self, throw: bool) -> Self {
        self.throw_on_invalid = throw;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = match value.into() {
            Value::Undefined | Value::Null => None,
            other => Some(other),
        };
        self
    }

    /// Read a dynamic options object. A one-element list under `type` marks
    /// the field as an array of that element's kind.
    pub fn from_value(options: &Value) -> Result<Self> {
        let mut field = FieldOptions::default();
        let mut kind_value = options.get("type").clone();

        if let Value::Array(items) = &kind_value {
            let item = single(items, "type")?;
            kind_value = match item {
                Value::String(name) => Value::String(name.to_lowercase()),
                other => other.clone(),
            };
            field.is_array = true;
        }

        let mut dynamic = options
            .fields()
            .cloned()
            .ok_or_else(|| ShapeError::InvalidConfiguration(format!("field options must be an object, got {}", options)))?;
        dynamic.insert("type".to_string(), kind_value);

        let checker = field.checker_options().merge_value(&Value::Object(dynamic))?;
        field.kind = checker.kind;
        field.required = checker.required;
        field.throw_on_invalid = checker.throw_on_invalid;
        field.default = checker.default;
        Ok(field)
    }

    fn checker_options(&self) -> CheckerOptions {
        CheckerOptions {
            kind: self.kind.clone(),
            required: self.required,
            throw_on_invalid: self.throw_on_invalid,
            return_boolean: true,
            default: self.default.clone(),
        }
    }
}

fn single<'a>(items: &'a [Value], what: &str) -> Result<&'a Value> {
    match items {
        [item] => Ok(item),
        _ => Err(ShapeError::InvalidConfiguration(format!(
            "array form of `{}` must hold exactly one element, got {}",
            what,
            items.len()
        ))),
    }
}

/// How a caller describes one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// A bare type token: required, non-throwing, scalar
    Token(TypeToken),
    /// `[T]`: an array of T. Must hold exactly one token or options entry.
    List(Vec<FieldSpec>),
    Options(FieldOptions),
}

impl FieldSpec {
    pub fn array_of(item: impl Into<FieldSpec>) -> Self {
        FieldSpec::List(vec![item.into()])
    }

    /// Read a dynamic field description: a string, a one-element list, or an
    /// options object
    pub fn from_value(spec: &Value) -> Result<Self> {
        match spec {
            Value::String(name) => Ok(FieldSpec::Token(TypeToken::Name(name.clone()))),
            Value::Array(items) => {
                let item = single(items, "field")?;
                let inner = match item {
                    Value::String(name) => FieldSpec::Token(TypeToken::Name(name.clone())),
                    other if other.is_object_shaped() => FieldSpec::Options(FieldOptions::from_value(other)?),
                    other => {
                        return Err(ShapeError::InvalidConfiguration(format!(
                            "array field element must be a type name or options object, got {}",
                            other
                        )))
                    }
                };
                Ok(FieldSpec::List(vec![inner]))
            }
            other if other.is_object_shaped() => Ok(FieldSpec::Options(FieldOptions::from_value(other)?)),
            other => Err(ShapeError::InvalidConfiguration(format!(
                "field description must be a type name, list or options object, got {}",
                other
            ))),
        }
    }

    /// Checker options and the array flag this spec compiles to
    fn compile(self) -> Result<(CheckerOptions, bool)> {
        match self {
            FieldSpec::Token(token) => Ok((FieldOptions::new(token.lowercased()).checker_options(), false)),
            FieldSpec::Options(options) => Ok((options.checker_options(), options.is_array)),
            FieldSpec::List(mut items) => {
                if items.len() != 1 {
                    return Err(ShapeError::InvalidConfiguration(format!(
                        "array field must hold exactly one element, got {}",
                        items.len()
                    )));
                }
                match items.remove(0) {
                    FieldSpec::Token(token) => Ok((FieldOptions::new(token.lowercased()).checker_options(), true)),
                    FieldSpec::Options(options) => Ok((options.checker_options(), true)),
                    FieldSpec::List(_) => Err(ShapeError::InvalidConfiguration(
                        "nested array fields are not supported".to_string(),
                    )),
                }
            }
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::Token(TypeToken::name(name))
    }
}

impl From<TypeToken> for FieldSpec {
    fn from(token: TypeToken) -> Self {
        FieldSpec::Token(token)
    }
}

impl From<Kind> for FieldSpec {
    fn from(kind: Kind) -> Self {
        FieldSpec::Token(kind.into())
    }
}

impl From<FieldOptions> for FieldSpec {
    fn from(options: FieldOptions) -> Self {
        FieldSpec::Options(options)
    }
}

/// A compiled field
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    boolean: TypeChecker,
    value: TypeChecker,
    is_array: bool,
}

impl Field {
    fn compile(name: String, spec: FieldSpec) -> Result<Self> {
        let (options, is_array) = spec.compile()?;
        Ok(Self {
            name,
            boolean: TypeChecker::new(options.clone().return_boolean(true)),
            value: TypeChecker::new(options.return_boolean(false)),
            is_array,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn checker(&self) -> &TypeChecker {
        &self.boolean
    }

    /// Array fields need an array whose every element passes; an empty
    /// array passes trivially
    fn verdict(&self, actual: &Value) -> Result<bool> {
        if !self.is_array {
            return self.boolean.verdict(actual);
        }
        match actual.as_array() {
            Some(items) => {
                let mut valid = true;
                for item in items {
                    if !self.boolean.verdict(item)? {
                        valid = false;
                    }
                }
                Ok(valid)
            }
            None => Ok(false),
        }
    }

    /// Array fields keep only the elements that project to something
    fn project(&self, actual: &Value) -> Result<Value> {
        match actual.as_array() {
            Some(items) if self.is_array => {
                let mut kept = Vec::with_capacity(items.len());
                for item in items {
                    let projected = self.value.project(item)?;
                    if !projected.is_undefined() {
                        kept.push(projected);
                    }
                }
                Ok(Value::Array(kept))
            }
            _ => self.value.project(actual),
        }
    }
}

/// Output of [`Schema::check`]
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Boolean(bool),
    Value(Map),
    All { boolean: bool, values: Map },
}

impl CheckResult {
    /// The verdict, when the mode reports one
    pub fn is_valid(&self) -> Option<bool> {
        match self {
            CheckResult::Boolean(valid) | CheckResult::All { boolean: valid, .. } => Some(*valid),
            CheckResult::Value(_) => None,
        }
    }

    /// The projection, when the mode reports one
    pub fn values(&self) -> Option<&Map> {
        match self {
            CheckResult::Value(values) | CheckResult::All { values, .. } => Some(values),
            CheckResult::Boolean(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CheckResult::Boolean(valid) => serde_json::Value::Bool(*valid),
            CheckResult::Value(values) => Value::Object(values.clone()).to_json(),
            CheckResult::All { boolean, values } => serde_json::json!({
                "boolean": boolean,
                "values": Value::Object(values.clone()).to_json(),
            }),
        }
    }
}

/// A compiled set of field checkers
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
    return_mode: ReturnMode,
}

impl Schema {
    /// Compile a schema from `(name, spec)` pairs. A repeated name replaces
    /// the earlier spec in place.
    pub fn new<N, S>(fields: impl IntoIterator<Item = (N, S)>) -> Result<Self>
    where
        N: Into<String>,
        S: Into<FieldSpec>,
    {
        fields
            .into_iter()
            .fold(SchemaBuilder::new(), |builder, (name, spec)| builder.field(name, spec))
            .build()
    }

    /// Compile a schema from a dynamic object of field descriptions
    pub fn from_value(structure: &Value) -> Result<Self> {
        let fields = structure
            .fields()
            .ok_or_else(|| ShapeError::InvalidConfiguration(format!("schema structure must be an object, got {}", structure)))?;

        let mut builder = SchemaBuilder::new();
        for (name, spec) in fields {
            builder = builder.field(name.clone(), FieldSpec::from_value(spec)?);
        }
        builder.build()
    }

    pub fn from_json(structure: &serde_json::Value) -> Result<Self> {
        Self::from_value(&Value::from(structure.clone()))
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn return_mode(&self) -> ReturnMode {
        self.return_mode
    }

    pub fn set_return_mode(&mut self, mode: ReturnMode) -> &mut Self {
        self.return_mode = mode;
        self
    }

    /// Set the return mode by name; unknown names select `Boolean`
    pub fn set_return_mode_str(&mut self, mode: &str) -> &mut Self {
        self.set_return_mode(ReturnMode::parse_lenient(mode))
    }

    /// Validate an instance against every declared field. Undeclared
    /// properties of the instance are ignored.
    pub fn check(&self, instance: &Value) -> Result<CheckResult> {
        if !instance.is_object_shaped() {
            return Err(ShapeError::InvalidInput(format!(
                "expected an object to check, got {}",
                TypeRegistry::global().describe(instance)
            )));
        }

        let mut valid = true;
        let mut values = Map::new();

        for field in &self.fields {
            let actual = instance.get(&field.name);
            let field_valid = field.verdict(actual)?;
            trace!(field = %field.name, valid = field_valid, "field checked");
            valid &= field_valid;
            values.insert(field.name.clone(), field.project(actual)?);
        }

        Ok(match self.return_mode {
            ReturnMode::Boolean => CheckResult::Boolean(valid),
            ReturnMode::Value => CheckResult::Value(values),
            ReturnMode::All => CheckResult::All { boolean: valid, values },
        })
    }

    pub fn check_json(&self, instance: &serde_json::Value) -> Result<CheckResult> {
        self.check(&Value::from(instance.clone()))
    }
}

/// Incremental construction of a [`Schema`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldSpec)>,
    return_mode: ReturnMode,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        let name = name.into();
        let spec = spec.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((name, spec)),
        }
        self
    }

    pub fn return_mode(mut self, mode: ReturnMode) -> Self {
        self.return_mode = mode;
        self
    }

    pub fn build(self) -> Result<Schema> {
        let fields = self
            .fields
            .into_iter()
            .map(|(name, spec)| Field::compile(name, spec))
            .collect::<Result<Vec<_>>>()?;

        debug!(fields = fields.len(), mode = %self.return_mode, "compiled schema");
        Ok(Schema {
            fields,
            return_mode: self.return_mode,
        })
    }
}
