//! Input loading and output writing for HASSL
//!
//! This crate sits between the file system and the compiler:
//!
//! - [`ProjectConfig`] - `hassl.yaml` with the output directory and
//!   generator options
//! - [`ModuleLoader`] - reads serialized modules from a source directory
//! - [`PackageWriter`] - writes one package file per module and merges
//!   helper cells into `helpers.yaml`
//!
//! # Example
//!
//! ```ignore
//! use hassl_config::{ModuleLoader, PackageWriter, ProjectConfig};
//!
//! let config = ProjectConfig::load("hassl")?;
//! let programs = ModuleLoader::new("hassl")?.load_all()?;
//! let writer = PackageWriter::new(config.output_dir_in("hassl".as_ref()))?;
//! ```

mod error;
mod loader;
mod writer;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ModuleLoader, ProjectConfig, PROJECT_FILE};
pub use writer::{PackageWriter, HELPERS_FILE};
