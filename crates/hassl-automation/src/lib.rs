//! Automation documents
//!
//! This crate models the automations HASSL emits for Home Assistant.
//! Automations are event-driven rules that execute actions when triggers
//! fire and conditions are met.
//!
//! # Architecture
//!
//! ```text
//! AUTOMATION = TRIGGER → CONDITIONS → ACTIONS
//! ```
//!
//! - **Triggers**: Event detectors that initiate the automation
//! - **Conditions**: State-based tests evaluated at trigger time
//! - **Actions**: Sequence of tasks to execute (modelled by hassl-script)
//!
//! # Key Types
//!
//! - [`Trigger`] - Event that starts an automation
//! - [`Condition`] - State check that must pass
//! - [`AutomationConfig`] - Complete automation definition

pub mod automation;
pub mod condition;
pub mod trigger;

pub use automation::{AutomationConfig, AutomationError, AutomationResult, ExecutionMode};
pub use condition::Condition;
pub use trigger::{StateMatch, Trigger};
