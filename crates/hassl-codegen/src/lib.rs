//! Code generation for HASSL
//!
//! Lowers an analyzed [`Module`](hassl_semantics::Module) into the Home
//! Assistant artifacts that implement it: helper cells, guarded writer
//! scripts, automations and workday sensors.
//!
//! # Key Types
//!
//! - [`generate`] - Lower one module into a [`Document`]
//! - [`GeneratorOptions`] - Queue bounds, maintain interval, guard length
//! - [`GuardRegistry`] - Guard cells consulted by `not_by` clauses
//! - [`GeneratedId`] - Deterministic identifier of a generated entity

pub mod document;
pub mod expr;
pub mod generator;
pub mod guard;
pub mod holidays;
pub mod naming;
pub mod rules;
pub mod schedule;
pub mod sync;

pub use document::{Document, Helpers, PackageFile, WorkdaySensor};
pub use expr::{compile_condition, compile_template};
pub use generator::{generate, GeneratorOptions};
pub use guard::GuardRegistry;
pub use naming::GeneratedId;
