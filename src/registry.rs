//! Type registry
//!
//! Maps type tokens to canonical kinds. The canonical table is fixed and
//! shared; callers that need extra names pass a [`CustomTypes`] table into a
//! [`ResolutionContext`] for the duration of one operation.
//!
//! Resolution walks the canonical entries in declaration order and the first
//! entry whose alias set contains the token wins:
//!
//! ```text
//! any, array, bigint, boolean, error, function, interface,
//! number, object, smallint, string, symbol, type, url
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;

use crate::value::{Marker, Value};

bitflags! {
    /// Identity bit of each canonical kind
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindFlags: u32 {
        const ANY = 1 << 0;
        const ARRAY = 1 << 1;
        const BIGINT = 1 << 2;
        const BOOLEAN = 1 << 4;
        const ERROR = 1 << 11;
        const FUNCTION = 1 << 12;
        const INTERFACE = 1 << 13;
        const NUMBER = 1 << 16;
        const OBJECT = 1 << 17;
        const SMALLINT = 1 << 18;
        const STRING = 1 << 19;
        const SYMBOL = 1 << 20;
        const TYPE = 1 << 21;
        const URL = 1 << 22;
    }
}

/// Canonical kinds, in resolution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Any,
    Array,
    BigInt,
    Boolean,
    Error,
    Function,
    Interface,
    Number,
    Object,
    SmallInt,
    String,
    Symbol,
    Type,
    Url,
}

impl Kind {
    pub const ALL: [Kind; 14] = [
        Kind::Any,
        Kind::Array,
        Kind::BigInt,
        Kind::Boolean,
        Kind::Error,
        Kind::Function,
        Kind::Interface,
        Kind::Number,
        Kind::Object,
        Kind::SmallInt,
        Kind::String,
        Kind::Symbol,
        Kind::Type,
        Kind::Url,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Kind::Any => "any",
            Kind::Array => "array",
            Kind::BigInt => "bigint",
            Kind::Boolean => "boolean",
            Kind::Error => "error",
            Kind::Function => "function",
            Kind::Interface => "interface",
            Kind::Number => "number",
            Kind::Object => "object",
            Kind::SmallInt => "smallint",
            Kind::String => "string",
            Kind::Symbol => "symbol",
            Kind::Type => "type",
            Kind::Url => "url",
        }
    }

    pub fn flag(&self) -> KindFlags {
        match self {
            Kind::Any => KindFlags::ANY,
            Kind::Array => KindFlags::ARRAY,
            Kind::BigInt => KindFlags::BIGINT,
            Kind::Boolean => KindFlags::BOOLEAN,
            Kind::Error => KindFlags::ERROR,
            Kind::Function => KindFlags::FUNCTION,
            Kind::Interface => KindFlags::INTERFACE,
            Kind::Number => KindFlags::NUMBER,
            Kind::Object => KindFlags::OBJECT,
            Kind::SmallInt => KindFlags::SMALLINT,
            Kind::String => KindFlags::STRING,
            Kind::Symbol => KindFlags::SYMBOL,
            Kind::Type => KindFlags::TYPE,
            Kind::Url => KindFlags::URL,
        }
    }

    /// The class marker standing for this kind
    pub fn marker(&self) -> Marker {
        match self {
            Kind::Any => Marker::ANY,
            Kind::Array => Marker::ARRAY,
            Kind::BigInt => Marker::BIGINT,
            Kind::Boolean => Marker::BOOLEAN,
            Kind::Error => Marker::ERROR,
            Kind::Function => Marker::FUNCTION,
            Kind::Interface => Marker::INTERFACE,
            Kind::Number => Marker::NUMBER,
            Kind::Object => Marker::OBJECT,
            Kind::SmallInt => Marker::SMALLINT,
            Kind::String => Marker::STRING,
            Kind::Symbol => Marker::SYMBOL,
            Kind::Type => Marker::TYPE,
            Kind::Url => Marker::URL,
        }
    }

    /// Commonly used kinds are checked structurally; the rest by instance-of
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Kind::Any
                | Kind::Array
                | Kind::BigInt
                | Kind::Boolean
                | Kind::Function
                | Kind::Number
                | Kind::Object
                | Kind::String
                | Kind::Symbol
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a caller writes to request a kind
#[derive(Debug, Clone, PartialEq)]
pub enum TypeToken {
    /// A kind name or alias such as `"number"`, `"num"` or `"[]"`
    Name(String),
    /// A class-like marker; builtin markers alias their canonical kind
    Marker(Marker),
    /// A literal value; some literals alias a kind (`0` is a number)
    Literal(Value),
}

impl TypeToken {
    pub fn name(name: impl Into<String>) -> Self {
        TypeToken::Name(name.into())
    }

    /// Lowercase a name token, leaving markers and literals alone
    pub fn lowercased(self) -> Self {
        match self {
            TypeToken::Name(name) => TypeToken::Name(name.to_lowercase()),
            other => other,
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Name(name) => f.write_str(name),
            TypeToken::Marker(marker) => write!(f, "{}", marker),
            TypeToken::Literal(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for TypeToken {
    fn from(name: &str) -> Self {
        TypeToken::Name(name.to_string())
    }
}

impl From<String> for TypeToken {
    fn from(name: String) -> Self {
        TypeToken::Name(name)
    }
}

impl From<Kind> for TypeToken {
    fn from(kind: Kind) -> Self {
        TypeToken::Marker(kind.marker())
    }
}

impl From<Marker> for TypeToken {
    fn from(marker: Marker) -> Self {
        TypeToken::Marker(marker)
    }
}

/// One row of the canonical table
#[derive(Clone)]
pub struct RegistryEntry {
    pub kind: Kind,
    /// Name aliases, matched ignoring ASCII case
    pub names: Vec<&'static str>,
    /// Literal aliases, matched by value equality
    pub literals: Vec<Value>,
    predicate: fn(&Value) -> bool,
}

impl RegistryEntry {
    fn new(kind: Kind, names: &[&'static str], literals: Vec<Value>, predicate: fn(&Value) -> bool) -> Self {
        Self {
            kind,
            names: names.to_vec(),
            literals,
            predicate,
        }
    }

    pub fn flag(&self) -> KindFlags {
        self.kind.flag()
    }

    /// Whether a token is one of this entry's aliases
    pub fn accepts(&self, token: &TypeToken) -> bool {
        match token {
            TypeToken::Name(name) => self.names.iter().any(|alias| alias.eq_ignore_ascii_case(name)),
            TypeToken::Marker(marker) => *marker == self.kind.marker(),
            TypeToken::Literal(value) => self.literals.contains(value),
        }
    }

    /// Whether a value belongs to this kind
    pub fn admits(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("kind", &self.kind)
            .field("names", &self.names)
            .field("literals", &self.literals)
            .finish_non_exhaustive()
    }
}

/// The canonical kind table
#[derive(Debug)]
pub struct TypeRegistry {
    entries: Vec<RegistryEntry>,
}

impl TypeRegistry {
    /// The shared canonical table
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::canonical)
    }

    fn canonical() -> Self {
        let entries = vec![
            RegistryEntry::new(Kind::Any, &["any", "*"], vec![], |_| true),
            RegistryEntry::new(Kind::Array, &["[]", "array"], vec![Value::Array(vec![])], Value::is_array),
            RegistryEntry::new(Kind::BigInt, &["n", "bigint"], vec![Value::BigInt(1)], |v| {
                v.type_of() == "bigint"
            }),
            RegistryEntry::new(
                Kind::Boolean,
                &["true", "false", "truefalse", "true, false", "boolean"],
                vec![Value::Bool(true), Value::Bool(false)],
                |v| v.type_of() == "boolean",
            ),
            RegistryEntry::new(Kind::Error, &["!", "error"], vec![], |v| v.instance_of(&Marker::ERROR)),
            RegistryEntry::new(
                Kind::Function,
                &["()", "=>", "() =>", "() {}", "() => {}", "=> {}", "fn", "function"],
                vec![],
                |v| v.type_of() == "function",
            ),
            RegistryEntry::new(Kind::Interface, &["interface"], vec![], |v| {
                v.instance_of(&Marker::INTERFACE)
            }),
            RegistryEntry::new(Kind::Number, &["0", "num", "number"], vec![Value::Number(0.0)], |v| {
                v.type_of() == "number"
            }),
            RegistryEntry::new(
                Kind::Object,
                &["{}", "obj", "object"],
                vec![Value::Object(Default::default())],
                Value::is_object_shaped,
            ),
            RegistryEntry::new(Kind::SmallInt, &["1s", "smallint", "small"], vec![], |v| {
                v.instance_of(&Marker::SMALLINT)
            }),
            RegistryEntry::new(Kind::String, &["'", "\"", "`", "string"], vec![], |v| {
                v.type_of() == "string"
            }),
            RegistryEntry::new(Kind::Symbol, &["sym", "symbol"], vec![], |v| v.type_of() == "symbol"),
            RegistryEntry::new(Kind::Type, &["type"], vec![], |v| v.instance_of(&Marker::TYPE)),
            RegistryEntry::new(Kind::Url, &["url"], vec![], |v| v.instance_of(&Marker::URL)),
        ];

        Self { entries }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entry(&self, kind: Kind) -> &RegistryEntry {
        // entries are laid out in `Kind::ALL` order
        &self.entries[kind as usize]
    }

    /// Resolve a token against the canonical table. First match wins.
    pub fn resolve(&self, token: &TypeToken) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.accepts(token))
    }

    /// Every canonical kind a value satisfies
    pub fn classify(&self, value: &Value) -> KindFlags {
        self.entries
            .iter()
            .filter(|entry| entry.admits(value))
            .fold(KindFlags::empty(), |flags, entry| flags | entry.flag())
    }

    /// Describe a value by its most specific canonical kind, for messages
    pub fn describe(&self, value: &Value) -> String {
        if value.is_undefined() {
            return "undefined".to_string();
        }
        if matches!(value, Value::Null) {
            return "null".to_string();
        }
        if let Value::Instance(instance) = value {
            if !instance.class.is_builtin() {
                return instance.class.to_string();
            }
        }
        // class-based kinds are more specific than the structural ones
        let flags = self.classify(value) - KindFlags::ANY;
        let mut candidates = Kind::ALL
            .iter()
            .filter(|kind| !kind.is_structural())
            .chain(Kind::ALL.iter().filter(|kind| kind.is_structural()));
        match candidates.find(|kind| flags.contains(kind.flag())) {
            Some(kind) => kind.name().to_string(),
            None => match value {
                Value::Instance(instance) => instance.class.to_string(),
                other => other.type_of().to_string(),
            },
        }
    }

    /// Layer a caller's custom names over the canonical table
    pub fn extend<'a>(&'a self, custom: &'a CustomTypes) -> ResolutionContext<'a> {
        ResolutionContext {
            registry: self,
            custom: Some(custom),
        }
    }

    pub fn context(&self) -> ResolutionContext<'_> {
        ResolutionContext {
            registry: self,
            custom: None,
        }
    }
}

/// Caller-supplied names for extra kinds, e.g. `"User" -> Marker("User")`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomTypes {
    tokens: BTreeMap<String, TypeToken>,
}

impl CustomTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, token: impl Into<TypeToken>) -> Self {
        self.insert(name, token);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, token: impl Into<TypeToken>) {
        self.tokens.insert(name.into(), token.into());
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&TypeToken> {
        self.tokens.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl<N: Into<String>, T: Into<TypeToken>> FromIterator<(N, T)> for CustomTypes {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut custom = CustomTypes::new();
        for (name, token) in iter {
            custom.insert(name, token);
        }
        custom
    }
}

/// Read-only view of the canonical table plus one operation's custom names
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    registry: &'a TypeRegistry,
    custom: Option<&'a CustomTypes>,
}

impl<'a> ResolutionContext<'a> {
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Turn a written type name into a token. Custom names match exactly;
    /// anything else is lowercased and treated as a canonical name.
    pub fn token_for(&self, name: &str) -> TypeToken {
        match self.custom.and_then(|custom| custom.get(name)) {
            Some(token) => token.clone(),
            None => TypeToken::Name(name.to_lowercase()),
        }
    }

    /// Whether a written type name will resolve to something meaningful
    pub fn is_known(&self, name: &str) -> bool {
        self.custom.map_or(false, |custom| custom.get(name).is_some())
            || self.registry.resolve(&TypeToken::Name(name.to_string())).is_some()
    }

    pub fn resolve(&self, name: &str) -> Option<&'a RegistryEntry> {
        self.registry.resolve(&self.token_for(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_follow_declared_order() {
        let registry = TypeRegistry::global();
        let kinds: Vec<Kind> = registry.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, Kind::ALL.to_vec());
        for kind in Kind::ALL {
            assert_eq!(registry.entry(kind).kind, kind);
        }
    }

    #[test]
    fn test_flags_are_distinct() {
        let mut seen = KindFlags::empty();
        for kind in Kind::ALL {
            assert!(!seen.intersects(kind.flag()), "{} reuses a flag", kind);
            assert_eq!(kind.flag().bits().count_ones(), 1);
            seen |= kind.flag();
        }
    }

    #[test]
    fn test_resolve_aliases() {
        let registry = TypeRegistry::global();
        let kind = |token: TypeToken| registry.resolve(&token).map(|e| e.kind);

        assert_eq!(kind(TypeToken::name("NUMBER")), Some(Kind::Number));
        assert_eq!(kind(TypeToken::name("0")), Some(Kind::Number));
        assert_eq!(kind(TypeToken::Literal(Value::Number(0.0))), Some(Kind::Number));
        assert_eq!(kind(TypeToken::name("fn")), Some(Kind::Function));
        assert_eq!(kind(TypeToken::name("*")), Some(Kind::Any));
        assert_eq!(kind(TypeToken::Literal(Value::Bool(false))), Some(Kind::Boolean));
        assert_eq!(kind(TypeToken::Marker(Marker::URL)), Some(Kind::Url));
        assert_eq!(kind(TypeToken::name("widget")), None);
        assert_eq!(kind(TypeToken::Marker(Marker::new("Widget"))), None);
    }

    #[test]
    fn test_flags_are_not_aliases() {
        let registry = TypeRegistry::global();
        let token = TypeToken::Literal(Value::Number(f64::from(KindFlags::ARRAY.bits())));
        assert!(registry.resolve(&token).is_none());
    }

    #[test]
    fn test_classify_value() {
        let registry = TypeRegistry::global();
        let flags = registry.classify(&Value::from("hi"));
        assert!(flags.contains(KindFlags::STRING | KindFlags::ANY));
        assert!(!flags.contains(KindFlags::NUMBER));
        assert_eq!(registry.describe(&Value::from(3)), "number");
        assert_eq!(registry.describe(&Value::url("https://example.com")), "url");
        assert_eq!(registry.describe(&Value::error("boom")), "error");
        assert!(registry.classify(&Value::error("boom")).contains(KindFlags::ERROR | KindFlags::OBJECT));
        assert_eq!(registry.describe(&Value::Null), "null");
    }

    #[test]
    fn test_custom_names_are_scoped_to_context() {
        let registry = TypeRegistry::global();
        let custom = CustomTypes::new().with("User", Marker::new("User"));
        let ctx = registry.extend(&custom);

        assert_eq!(ctx.token_for("User"), TypeToken::Marker(Marker::new("User")));
        assert_eq!(ctx.token_for("String"), TypeToken::name("string"));
        assert!(ctx.is_known("User"));
        assert!(!registry.context().is_known("User"));
    }
}
