//! Core types for the HASSL compiler
//!
//! This crate provides the leaf types shared by every stage of the
//! compiler: device identifiers, the domain metadata table, duration and
//! time literal parsing, and the input syntax tree handed over by the
//! front end.

pub mod ast;
pub mod domains;
pub mod duration;
mod entity_id;
mod error;
pub mod time;

pub use domains::{Property, PropertySpec, ProxyKind};
pub use duration::{format_hms, format_signed_hms, parse_duration};
pub use entity_id::{EntityId, EntityIdError};
pub use error::LiteralError;
pub use time::{MonthDay, SunEvent, TimeSpec, Weekday};

/// Prefix of every generated identifier
pub const HASSL_PREFIX: &str = "hassl";
