//! Script documents
//!
//! This crate models the writer scripts and action lists HASSL emits.
//! Scripts are sequences of actions that can be called from automations as
//! services.
//!
//! # Action Types
//!
//! - Service calls
//! - Delays
//! - Wait for trigger
//! - Conditionals (choose)
//!
//! # Key Types
//!
//! - [`Action`] - A single action in a script or automation
//! - [`ScriptConfig`] - A complete script definition

pub mod action;
pub mod script;

pub use action::{Action, ChooseOption, Target};
pub use script::ScriptConfig;
