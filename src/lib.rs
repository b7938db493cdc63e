//! shapecheck
//!
//! Runtime shape validation for dynamically typed objects.
//!
//! ## Features
//!
//! - **Type Registry**: Canonical kinds with alias tokens (`"num"`, `"[]"`, `0`, …)
//! - **Type Checking**: Boolean or value-or-default checks under a required/throw policy
//! - **Schemas**: Compiled per-field checkers producing a verdict, a projection, or both
//! - **Declaration Files**: A small `NAME = TYPE;` language compiled into schemas
//!
//! ## Architecture
//!
//! ```text
//! declaration text ──► DeclarationParser ──► Declaration (field descriptors)
//!                                                 │
//!                                                 ▼
//!                 instance ──► Schema::check ──► TypeChecker per field ──► CheckResult
//! ```
//!
//! ## Example
//!
//! ```
//! use shapecheck::{DeclarationParser, ReturnMode, Value};
//! use serde_json::json;
//!
//! let declaration = DeclarationParser::new()
//!     .parse(r#"name = Optional<string:"anon">; tags = Array<string>;"#)
//!     .unwrap();
//! let mut schema = declaration.build_schema().unwrap();
//! schema.set_return_mode(ReturnMode::Value);
//!
//! let result = schema.check(&Value::from(json!({"tags": ["a", 1]}))).unwrap();
//! assert_eq!(
//!     Value::Object(result.values().unwrap().clone()).to_json(),
//!     json!({"name": "anon", "tags": ["a"]})
//! );
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod source;
pub mod value;

pub use checker::{CheckerOptions, Checked, Outcome, ResolvedKind, TypeChecker};
pub use config::ShapeConfig;
pub use error::{ErrorKind, Result, ShapeError};
pub use parser::{Declaration, DeclarationParser, DefaultPolicy, FieldDeclaration, Settings};
pub use registry::{CustomTypes, Kind, KindFlags, ResolutionContext, TypeRegistry, TypeToken};
pub use schema::{CheckResult, Field, FieldOptions, FieldSpec, ReturnMode, Schema, SchemaBuilder};
pub use source::{FsSource, MemorySource, Source, SourceError};
pub use value::{Instance, Map, Marker, Value};
