//! Resolution error types
//!
//! Every failure propagates straight up the recursive resolution chain. A graph
//! with one unresolved node cannot be completed, so nothing is retried.

use thiserror::Error;

use crate::qualifier::QualifierSet;

/// Boxed error returned by user-supplied constructors and factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for resolution operations
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors raised while resolving or materializing a dependency graph
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No candidate satisfies the request, or a primitive parameter was found
    #[error("{reason}")]
    Unsatisfied {
        type_name: &'static str,
        qualifiers: QualifierSet,
        reason: String,
    },

    /// Two or more equally qualified candidates remain
    #[error("{message}")]
    Ambiguous {
        type_name: &'static str,
        message: String,
    },

    /// A type+qualifier key reappeared on the in-progress stack
    #[error("Circular dependency detected on type [{type_name}] (path: {})", .path.join(" -> "))]
    CircularDependency {
        type_name: &'static str,
        path: Vec<&'static str>,
    },

    /// The construction backend failed
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A value could not be viewed as the requested type
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A constructor asked for an argument that was not supplied
    #[error("Missing argument {index} (expected {expected})")]
    MissingArgument { index: usize, expected: &'static str },
}

impl ResolutionError {
    /// Nothing matched `type_name` with `qualifiers`
    pub fn no_qualified_bean(type_name: &'static str, qualifiers: &QualifierSet) -> Self {
        Self::Unsatisfied {
            type_name,
            qualifiers: qualifiers.clone(),
            reason: format!(
                "No qualified bean found for type {} with qualifiers {}",
                type_name, qualifiers
            ),
        }
    }

    /// A primitive-typed parameter can never be resolved
    pub fn primitive_parameter(type_name: &'static str, owner: &'static str) -> Self {
        Self::Unsatisfied {
            type_name,
            qualifiers: QualifierSet::universal(),
            reason: format!(
                "Unsatisfied dependencies for type {} as parameter of {}",
                type_name, owner
            ),
        }
    }

    /// A primitive type was requested and no factory produces it
    pub fn primitive_type(type_name: &'static str, qualifiers: &QualifierSet) -> Self {
        Self::Unsatisfied {
            type_name,
            qualifiers: qualifiers.clone(),
            reason: format!(
                "Unsatisfied dependencies for primitive type {}: no factory produces it",
                type_name
            ),
        }
    }

    /// The type declares no way to build it
    pub fn no_construction_path(type_name: &'static str, qualifiers: &QualifierSet) -> Self {
        Self::Unsatisfied {
            type_name,
            qualifiers: qualifiers.clone(),
            reason: format!(
                "Unsatisfied dependencies for type {}: no constructor or factory is declared",
                type_name
            ),
        }
    }

    /// Several constructors and not exactly one marked injectable
    pub fn ambiguous_constructors(type_name: &'static str, candidates: &[String]) -> Self {
        Self::Ambiguous {
            type_name,
            message: format!(
                "Ambiguous constructors in type {}. Mark exactly one constructor as injectable. Candidates: [{}]",
                type_name,
                candidates.join(", ")
            ),
        }
    }

    pub fn is_unsatisfied(&self) -> bool {
        matches!(self, Self::Unsatisfied { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// The construction backend failed to produce a value
#[derive(Debug, Error)]
#[error("Failed to construct {type_name}: {source}")]
pub struct ConstructionError {
    pub type_name: &'static str,
    #[source]
    pub source: BoxError,
}

impl ConstructionError {
    pub fn new(type_name: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            type_name,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = ResolutionError::primitive_parameter("i32", "app::Service");
        assert_eq!(
            err.to_string(),
            "Unsatisfied dependencies for type i32 as parameter of app::Service"
        );

        let err = ResolutionError::CircularDependency {
            type_name: "app::D",
            path: vec!["app::A", "app::B", "app::D"],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected on type [app::D] (path: app::A -> app::B -> app::D)"
        );

        let err = ResolutionError::ambiguous_constructors("app::Two", &["new()".into(), "with(u8)".into()]);
        assert!(err.to_string().contains("constructors"));
        assert!(err.is_ambiguous());
    }

    #[test]
    fn test_construction_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err: ResolutionError = ConstructionError::new("app::Repo", io).into();
        assert_eq!(err.to_string(), "Failed to construct app::Repo: disk on fire");
        assert_eq!(err.source().unwrap().to_string(), "disk on fire");
    }
}
