//! Semantic analysis for HASSL
//!
//! Turns the front end's syntax tree into the intermediate representation
//! consumed by the code generator.
//!
//! # Pipeline
//!
//! ```text
//! Program --resolve_scope--> Scope --analyze--> Module --with_module--> ExportTable
//! ```
//!
//! - [`resolve_scope`] binds imported and local names
//! - [`analyze`] builds the IR of one module
//! - [`build`] runs both over many modules in import order

pub mod analyzer;
pub mod build;
mod error;
pub mod exports;
pub mod ir;
pub mod resolver;

pub use analyzer::{analyze, compile_module, sync_properties};
pub use build::{build, build_order};
pub use error::{SemanticError, SemanticResult};
pub use exports::{DeclKind, Export, ExportTable};
pub use ir::{Module, QualifiedName};
pub use resolver::{resolve_scope, Scope};
