//! Declaration file parser
//!
//! Declarations are `;`-terminated statements:
//!
//! ```text
//! SETTING = throwError:true;
//! name    = Optional<string:"anon">;
//! age     = number;
//! tags    = Array<string>;
//! owner   = User;
//! ```
//!
//! Parsing runs in two passes: the first collects `SETTING` directives, the
//! second resolves field types and defaults, so directive placement never
//! changes the result.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ShapeError};
use crate::registry::{CustomTypes, ResolutionContext, TypeRegistry, TypeToken};
use crate::schema::{FieldOptions, FieldSpec, Schema};
use crate::source::Source;
use crate::value::Value;

/// Statement name that introduces a directive instead of a field
pub const SETTING: &str = "SETTING";

fn modifier_regex() -> &'static Regex {
    static MODIFIER: OnceLock<Regex> = OnceLock::new();
    MODIFIER.get_or_init(|| Regex::new(r"^(Optional|Array) ?<").expect("modifier pattern is valid"))
}

/// How embedded default literals are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultPolicy {
    /// Every literal except `null` is a default
    #[default]
    Explicit,
    /// Empty strings and falsy literals other than `false` mean "no default"
    Legacy,
}

impl DefaultPolicy {
    fn apply(&self, literal: Value) -> Option<Value> {
        match (self, literal) {
            (_, Value::Null) => None,
            (DefaultPolicy::Legacy, Value::Bool(false)) => Some(Value::Bool(false)),
            (DefaultPolicy::Legacy, value) if !value.is_truthy() => None,
            (_, value) => Some(value),
        }
    }
}

/// Parser-level directives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// `throwError`: every field raises on invalid values
    pub throw_error: bool,
    /// `legacyDefaults`
    pub default_policy: DefaultPolicy,
    /// Directives this parser does not interpret, kept verbatim
    pub extra: BTreeMap<String, String>,
}

/// One field statement, after type analysis
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: String,
    pub kind: TypeToken,
    pub optional: bool,
    pub is_array: bool,
    pub default: Option<Value>,
}

/// A parsed declaration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declaration {
    pub settings: Settings,
    pub fields: Vec<FieldDeclaration>,
}

impl Declaration {
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field-descriptor map consumed by the schema builder
    pub fn field_specs(&self) -> Vec<(String, FieldSpec)> {
        self.fields
            .iter()
            .map(|field| {
                let options = FieldOptions {
                    kind: field.kind.clone(),
                    required: !field.optional,
                    throw_on_invalid: self.settings.throw_error,
                    is_array: field.is_array,
                    default: if field.optional { field.default.clone() } else { None },
                };
                (field.name.clone(), FieldSpec::Options(options))
            })
            .collect()
    }

    pub fn build_schema(&self) -> Result<Schema> {
        Schema::new(self.field_specs())
    }

    /// JSON summary of the declaration, for display
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|f| {
                let mut entry = serde_json::json!({
                    "type": f.kind.to_string(),
                    "required": !f.optional,
                    "array": f.is_array,
                });
                if let Some(default) = &f.default {
                    entry["default"] = default.to_json();
                }
                (f.name.clone(), entry)
            })
            .collect();

        serde_json::json!({
            "settings": {
                "throwError": self.settings.throw_error,
                "defaults": self.settings.default_policy,
                "extra": self.settings.extra,
            },
            "fields": fields,
        })
    }
}

/// A `NAME = EXPR` statement
#[derive(Debug, Clone, Copy)]
struct Statement<'a> {
    index: usize,
    text: &'a str,
    name: &'a str,
    expr: &'a str,
}

impl Statement<'_> {
    fn error(&self, reason: impl Into<String>) -> ShapeError {
        ShapeError::syntax(self.index, self.text, reason)
    }
}

/// Translates declaration text into a [`Declaration`]
#[derive(Debug, Clone, Default)]
pub struct DeclarationParser {
    custom: CustomTypes,
}

impl DeclarationParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names that resolve to caller-defined kinds in this parser's output
    pub fn with_custom_types(mut self, custom: CustomTypes) -> Self {
        self.custom = custom;
        self
    }

    pub fn parse(&self, text: &str) -> Result<Declaration> {
        let flat: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        let statements = split_statements(&flat)?;
        let ctx = TypeRegistry::global().extend(&self.custom);

        let mut declaration = Declaration::default();

        for statement in statements.iter().filter(|s| s.name == SETTING) {
            apply_setting(&mut declaration.settings, statement)?;
        }

        for statement in statements.iter().filter(|s| s.name != SETTING) {
            if declaration.field(statement.name).is_some() {
                return Err(statement.error(format!("field `{}` is declared twice", statement.name)));
            }
            let field = parse_field(statement, &ctx, declaration.settings.default_policy)?;
            declaration.fields.push(field);
        }

        debug!(
            statements = statements.len(),
            fields = declaration.fields.len(),
            throw_error = declaration.settings.throw_error,
            "parsed declaration"
        );
        Ok(declaration)
    }

    /// Read a declaration through a [`Source`] and parse it
    pub fn parse_source(&self, source: &dyn Source, path: &str) -> Result<Declaration> {
        let text = source.read_all(path)?;
        self.parse(&text)
    }

    /// Read, parse and compile in one step
    pub fn load_schema(&self, source: &dyn Source, path: &str) -> Result<Schema> {
        self.parse_source(source, path)?.build_schema()
    }
}

/// Cut flattened text at `;`; whatever follows the last `;` is discarded
fn split_statements(text: &str) -> Result<Vec<Statement<'_>>> {
    let mut pieces: Vec<&str> = text.split(';').collect();
    pieces.pop();

    let mut statements = Vec::with_capacity(pieces.len());
    for (index, text) in pieces.into_iter().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        let statement = Statement {
            index,
            text,
            name: "",
            expr: "",
        };
        let (name, expr) = text
            .split_once('=')
            .ok_or_else(|| statement.error("expected `NAME = TYPE`, found no `=`"))?;
        let (name, expr) = (name.trim(), expr.trim());
        if name.is_empty() {
            return Err(statement.error("missing name before `=`"));
        }
        if expr.is_empty() {
            return Err(statement.error("missing type after `=`"));
        }
        statements.push(Statement { name, expr, ..statement });
    }
    Ok(statements)
}

fn apply_setting(settings: &mut Settings, statement: &Statement) -> Result<()> {
    let (key, raw) = statement
        .expr
        .split_once(':')
        .ok_or_else(|| statement.error("expected `SETTING = key:value`"))?;
    let (key, raw) = (key.trim(), raw.trim());

    match key {
        "throwError" => settings.throw_error = json_flag(statement, raw)?,
        "legacyDefaults" => {
            settings.default_policy = if json_flag(statement, raw)? {
                DefaultPolicy::Legacy
            } else {
                DefaultPolicy::Explicit
            }
        }
        _ => {
            debug!(setting = key, value = raw, "keeping uninterpreted setting");
            settings.extra.insert(key.to_string(), raw.to_string());
        }
    }
    Ok(())
}

/// A setting is on only when its value parses to JSON `true`
fn json_flag(statement: &Statement, raw: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| statement.error(format!("setting value `{}` is not valid JSON: {}", raw, e)))?;
    Ok(value == serde_json::Value::Bool(true))
}

fn parse_field(statement: &Statement, ctx: &ResolutionContext, policy: DefaultPolicy) -> Result<FieldDeclaration> {
    let mut optional = false;
    let mut default = None;
    let mut body = statement.expr;

    if let Some(inner) = strip_modifier(statement, body, "Optional")? {
        optional = true;
        body = match split_default(inner) {
            Some((base, literal)) => {
                default = parse_default(statement, literal.trim(), policy)?;
                base.trim()
            }
            None => inner,
        };
    }

    let mut is_array = false;
    if let Some(inner) = strip_modifier(statement, body, "Array")? {
        if modifier_regex().is_match(inner) {
            return Err(statement.error("modifiers cannot be nested inside `Array<>`"));
        }
        is_array = true;
        body = inner;
    }

    if body.is_empty() {
        return Err(statement.error("missing type name"));
    }
    if body.contains(&['<', '>'][..]) {
        return Err(statement.error(format!("unsupported type expression `{}`", body)));
    }
    if body.contains(':') {
        return Err(statement.error("default values are only allowed inside `Optional<>`"));
    }

    if !ctx.is_known(body) {
        warn!(field = statement.name, token = body, "type name matches no known kind");
    }

    Ok(FieldDeclaration {
        name: statement.name.to_string(),
        kind: ctx.token_for(body),
        optional,
        is_array,
        default,
    })
}

/// Inner text of `Keyword<...>` or `Keyword <...>`, if `expr` starts with it
fn strip_modifier<'s>(statement: &Statement, expr: &'s str, keyword: &str) -> Result<Option<&'s str>> {
    let Some(open) = modifier_regex().find(expr).filter(|m| m.as_str().starts_with(keyword)) else {
        return Ok(None);
    };
    let inner = expr[open.end()..]
        .strip_suffix('>')
        .ok_or_else(|| statement.error(format!("unterminated `{}<`", keyword)))?;
    Ok(Some(inner.trim()))
}

/// Split `TYPE:LITERAL` at the first `:` outside angle brackets
fn split_default(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (at, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some((&inner[..at], &inner[at + 1..])),
            _ => {}
        }
    }
    None
}

fn parse_default(statement: &Statement, literal: &str, policy: DefaultPolicy) -> Result<Option<Value>> {
    if literal.is_empty() {
        return Ok(None);
    }
    let json: serde_json::Value = serde_json::from_str(literal)
        .map_err(|e| statement.error(format!("default `{}` is not valid JSON: {}", literal, e)))?;
    Ok(policy.apply(Value::from(json)))
}
