//! Jedi: typed dependency resolution
//!
//! [`Jedi`] bundles a [`TypeRegistry`], the [`Resolver`] driven by it and the
//! loaded [`JediConfig`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jedi::{Constructor, Jedi, QualifierSet, TypeRegistry};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_type::<Clock>().constructor(Constructor::from_fn(Clock::new));
//!
//! let jedi = Jedi::new(registry);
//! let clock = jedi.get_bean::<Clock>(QualifierSet::universal())?;
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

pub use jedi_common::{format_error, ConfigError, ConfigLoader, JediConfig, LoggingConfig, ResolverSettings};
pub use jedi_di::{
    BeanValue, InstanceHandle, Qualifier, QualifierSet, ResolutionError, ResolutionResult, Resolver, TypeKey,
    TypeKind,
};
pub use jedi_registry::{Constructor, Factory, TypeRegistration, TypeRegistry};

/// Errors raised while building or validating a container
#[derive(Debug, Error)]
pub enum JediError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Validation failed for {} of {} registered types", .report.failures.len(), .report.checked)]
    Validation { report: ValidationReport },
}

/// A registered type that could not be resolved
#[derive(Debug)]
pub struct ValidationFailure {
    pub ty: TypeKey,
    pub error: ResolutionError,
}

/// Outcome of [`Jedi::validate`]
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub checked: usize,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry, resolver and configuration in one place
pub struct Jedi {
    registry: Arc<TypeRegistry>,
    resolver: Resolver,
    config: JediConfig,
}

impl Jedi {
    /// Container over `registry` with default configuration
    pub fn new(registry: TypeRegistry) -> Self {
        let registry = Arc::new(registry);
        let resolver = Resolver::new(registry.clone(), registry.clone());
        Self {
            registry,
            resolver,
            config: JediConfig::default(),
        }
    }

    /// Container over every registration submitted through `inventory`
    pub fn discover() -> Self {
        Self::new(TypeRegistry::discover())
    }

    /// Container with explicit configuration
    ///
    /// With `resolver.validate_on_startup` set, every registered type is
    /// resolved up front and any failure aborts construction.
    pub fn with_config(registry: TypeRegistry, config: JediConfig) -> Result<Self, JediError> {
        let mut jedi = Self::new(registry);
        jedi.config = config;

        if jedi.config.resolver.validate_on_startup {
            let report = jedi.validate();
            if !report.is_ok() {
                return Err(JediError::Validation { report });
            }
        }
        Ok(jedi)
    }

    /// Container configured from `loader`
    pub fn load(registry: TypeRegistry, loader: &ConfigLoader) -> Result<Self, JediError> {
        let config = loader.load()?;
        Self::with_config(registry, config)
    }

    /// Install the stderr subscriber described by the logging configuration
    pub fn init_logging(&self) -> bool {
        jedi_common::logging::init(&self.config.logging)
    }

    /// Handle for `T` with `qualifiers`
    pub fn select<T: ?Sized + 'static>(&self, qualifiers: QualifierSet) -> ResolutionResult<Arc<InstanceHandle>> {
        self.resolver.resolve_type::<T>(qualifiers)
    }

    /// Value of `T` with `qualifiers`
    pub fn get_bean<T: ?Sized + Send + Sync + 'static>(&self, qualifiers: QualifierSet) -> ResolutionResult<Arc<T>> {
        self.resolver.get::<T>(qualifiers)
    }

    /// Resolve every registered type and collect the failures
    ///
    /// Only resolution is attempted; no value is created.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (ty, _) in self.registry.registered_types() {
            report.checked += 1;
            if let Err(error) = self.resolver.resolve(ty, QualifierSet::universal()) {
                warn!(ty = %ty, "validation failed: {}", format_error(&error));
                report.failures.push(ValidationFailure { ty, error });
            }
        }

        info!(
            "Validated {} registered types, {} failed",
            report.checked,
            report.failures.len()
        );
        report
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &JediConfig {
        &self.config
    }
}

impl fmt::Debug for Jedi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jedi")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish()
    }
}
