//! Runtime values checked by the engine
//!
//! Instances handed to a [`Schema`](crate::Schema) are dynamically typed, so the
//! engine works over its own [`Value`] enum rather than Rust types. JSON input
//! converts losslessly into it; class-like values (errors, URLs, user classes)
//! are modelled as [`Instance`]s tagged with a [`Marker`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Keyed fields of an object value
pub type Map = BTreeMap<String, Value>;

/// Opaque identity of a class-like type, used for instance-of checks
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker(Cow<'static, str>);

impl Marker {
    pub const ANY: Marker = Marker(Cow::Borrowed("Any"));
    pub const ARRAY: Marker = Marker(Cow::Borrowed("Array"));
    pub const BIGINT: Marker = Marker(Cow::Borrowed("BigInt"));
    pub const BOOLEAN: Marker = Marker(Cow::Borrowed("Boolean"));
    pub const ERROR: Marker = Marker(Cow::Borrowed("Error"));
    pub const FUNCTION: Marker = Marker(Cow::Borrowed("Function"));
    pub const INTERFACE: Marker = Marker(Cow::Borrowed("Interface"));
    pub const NUMBER: Marker = Marker(Cow::Borrowed("Number"));
    pub const OBJECT: Marker = Marker(Cow::Borrowed("Object"));
    pub const SMALLINT: Marker = Marker(Cow::Borrowed("SmallInt"));
    pub const STRING: Marker = Marker(Cow::Borrowed("String"));
    pub const SYMBOL: Marker = Marker(Cow::Borrowed("Symbol"));
    pub const TYPE: Marker = Marker(Cow::Borrowed("Type"));
    pub const URL: Marker = Marker(Cow::Borrowed("URL"));

    const BUILTIN: [Marker; 14] = [
        Marker::ANY,
        Marker::ARRAY,
        Marker::BIGINT,
        Marker::BOOLEAN,
        Marker::ERROR,
        Marker::FUNCTION,
        Marker::INTERFACE,
        Marker::NUMBER,
        Marker::OBJECT,
        Marker::SMALLINT,
        Marker::STRING,
        Marker::SYMBOL,
        Marker::TYPE,
        Marker::URL,
    ];

    /// Create a marker for a user-defined class
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this marker names one of the engine's own classes
    pub fn is_builtin(&self) -> bool {
        Self::BUILTIN.contains(self)
    }

    /// Classes whose instances box a primitive or a list rather than
    /// carrying keyed fields
    pub fn is_primitive_wrapper(&self) -> bool {
        [Marker::ARRAY, Marker::BIGINT, Marker::BOOLEAN, Marker::NUMBER, Marker::STRING, Marker::SYMBOL].contains(self)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value created from a class-like type
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// The class this value was created from
    pub class: Marker,
    /// Classes the value's class derives from, nearest first
    pub ancestors: Vec<Marker>,
    /// Own fields of the instance
    pub fields: Map,
}

impl Instance {
    pub fn new(class: Marker) -> Self {
        Self {
            class,
            ancestors: Vec::new(),
            fields: Map::new(),
        }
    }

    pub fn extends(mut self, parent: Marker) -> Self {
        self.ancestors.push(parent);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Instance-of check against a class marker, walking the ancestor chain
    pub fn is_instance_of(&self, marker: &Marker) -> bool {
        &self.class == marker || self.ancestors.contains(marker)
    }
}

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value (a missing field, or a rejected value with no default)
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    /// A symbol, identified by its description
    Symbol(String),
    /// A callable, identified by its name
    Function(String),
    Array(Vec<Value>),
    Object(Map),
    Instance(Instance),
}

impl Value {
    /// Runtime primitive category, as a `typeof` check would report it
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Instance(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Keyed structure: a map, or any instance that is not a primitive
    /// wrapper. Arrays, null and primitives are not object-shaped.
    pub fn is_object_shaped(&self) -> bool {
        self.fields().is_some()
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Fields of an object-shaped value
    pub fn fields(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            Value::Instance(instance) if !instance.class.is_primitive_wrapper() => Some(&instance.fields),
            _ => None,
        }
    }

    /// Look up a field, yielding `Undefined` when absent or not object-shaped
    pub fn get(&self, key: &str) -> &Value {
        static UNDEFINED: Value = Value::Undefined;
        self.fields().and_then(|map| map.get(key)).unwrap_or(&UNDEFINED)
    }

    pub fn instance_of(&self, marker: &Marker) -> bool {
        match self {
            Value::Instance(instance) => instance.is_instance_of(marker),
            _ => false,
        }
    }

    /// JavaScript-style truthiness, used by the legacy default policy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::BigInt(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Create an `Error` instance carrying a message
    pub fn error(message: impl Into<String>) -> Self {
        Value::Instance(Instance::new(Marker::ERROR).with_field("message", message.into()))
    }

    /// Create a `URL` instance carrying its href
    pub fn url(href: impl Into<String>) -> Self {
        Value::Instance(Instance::new(Marker::URL).with_field("href", href.into()))
    }

    /// Render as JSON. Undefined object entries are omitted and undefined
    /// array items become `null`; symbols and big integers become strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::BigInt(n) => Json::String(n.to_string()),
            Value::String(s) | Value::Symbol(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => map_to_json(map),
            Value::Instance(instance) => map_to_json(&instance.fields),
        }
    }
}

fn map_to_json(map: &Map) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .filter(|(_, v)| !v.is_undefined())
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::Symbol(s) => write!(f, "Symbol({})", s),
            Value::Function(name) => write!(f, "[Function {}]", name),
            Value::Instance(instance) => write!(f, "{} {}", instance.class, map_to_json(&instance.fields)),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_of_categories() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::Array(vec![]).type_of(), "object");
        assert_eq!(Value::BigInt(1).type_of(), "bigint");
        assert_eq!(Value::Function("f".into()).type_of(), "function");
        assert_eq!(Value::Undefined.type_of(), "undefined");
    }

    #[test]
    fn test_object_shape() {
        assert!(Value::from(json!({"a": 1})).is_object_shaped());
        assert!(!Value::from(json!([1])).is_object_shaped());
        assert!(!Value::Null.is_object_shaped());
        assert!(Value::error("boom").is_object_shaped());
        assert!(Value::url("https://example.com").is_object_shaped());
        assert!(!Value::Instance(Instance::new(Marker::NUMBER).with_field("value", 1)).is_object_shaped());
        assert!(!Value::Instance(Instance::new(Marker::STRING)).is_object_shaped());
        assert!(Value::Instance(Instance::new(Marker::new("User"))).is_object_shaped());
        assert_eq!(Value::error("boom").get("message"), &Value::from("boom"));
    }

    #[test]
    fn test_get_missing_is_undefined() {
        let v = Value::from(json!({"a": 1}));
        assert_eq!(v.get("a"), &Value::Number(1.0));
        assert!(v.get("b").is_undefined());
        assert!(Value::Number(3.0).get("a").is_undefined());
    }

    #[test]
    fn test_instance_of_walks_ancestors() {
        let err = Value::Instance(Instance::new(Marker::new("TypeError")).extends(Marker::ERROR));
        assert!(err.instance_of(&Marker::ERROR));
        assert!(!err.instance_of(&Marker::URL));
    }

    #[test]
    fn test_to_json_drops_undefined_entries() {
        let mut map = Map::new();
        map.insert("kept".into(), Value::from("x"));
        map.insert("gone".into(), Value::Undefined);
        map.insert("list".into(), Value::Array(vec![Value::Undefined, Value::from(1)]));
        assert_eq!(Value::Object(map).to_json(), json!({"kept": "x", "list": [null, 1]}));
    }
}
