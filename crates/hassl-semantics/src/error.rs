//! Semantic error taxonomy

use hassl_core::LiteralError;
use thiserror::Error;

/// Result type for resolution and analysis
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that stop a module from compiling
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SemanticError {
    /// A name that is neither bound in scope nor a device identifier
    #[error("name error in package '{package}': unresolved name '{name}'")]
    NameError { package: String, name: String },

    /// Import of an unknown package or of a name it does not export
    #[error("import error in package '{package}': {reason}")]
    ImportError { package: String, reason: String },

    /// Modules that import each other
    #[error("cyclic import: {}", cycle.join(" -> "))]
    CyclicImportError { cycle: Vec<String> },

    /// A sync with fewer than two distinct members
    #[error("sync '{sync}' in package '{package}' needs at least 2 members, found {found}")]
    EmptySyncError {
        package: String,
        sync: String,
        found: usize,
    },

    #[error("malformed duration in package '{package}': {source}")]
    MalformedDurationError {
        package: String,
        #[source]
        source: LiteralError,
    },

    #[error("malformed time in package '{package}': {source}")]
    MalformedTimeSpecError {
        package: String,
        #[source]
        source: LiteralError,
    },

    /// An `invert` entry that is not a member of its sync
    #[error("sync '{sync}' in package '{package}' inverts '{entity}', which is not a member")]
    InvertNotMemberError {
        package: String,
        sync: String,
        entity: String,
    },

    #[error("duplicate {kind} '{name}' in package '{package}'")]
    DuplicateDeclarationError {
        package: String,
        kind: &'static str,
        name: String,
    },

    #[error("package '{package}' is declared by more than one module")]
    DuplicatePackageError { package: String },
}

impl SemanticError {
    pub(crate) fn name(package: &str, name: impl Into<String>) -> Self {
        SemanticError::NameError {
            package: package.to_string(),
            name: name.into(),
        }
    }

    pub(crate) fn import(package: &str, reason: impl Into<String>) -> Self {
        SemanticError::ImportError {
            package: package.to_string(),
            reason: reason.into(),
        }
    }

    /// Map a literal error to its semantic kind
    pub(crate) fn literal(package: &str, source: LiteralError) -> Self {
        match source {
            LiteralError::Duration(_) => SemanticError::MalformedDurationError {
                package: package.to_string(),
                source,
            },
            LiteralError::Time(_) | LiteralError::Date(_) => {
                SemanticError::MalformedTimeSpecError {
                    package: package.to_string(),
                    source,
                }
            }
        }
    }
}
