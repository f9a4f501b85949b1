//! Dependency resolution engine
//!
//! Given a requested type and a set of qualifiers, the [`Resolver`] builds an
//! [`InstanceHandle`] describing how to obtain a value: which implementations
//! or factories are candidates, which constructor to call and which beans feed
//! each of its parameters. Values are only created when the handle is asked
//! for one.
//!
//! The resolver knows nothing about how types are described or built. It asks
//! a [`MetadataProvider`] for structure and a [`ConstructionBackend`] for
//! values, so any registry that implements both traits can drive it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jedi_di::{QualifierSet, Resolver};
//!
//! let resolver = Resolver::new(metadata, backend);
//! let handle = resolver.resolve_type::<dyn Saber>(QualifierSet::universal())?;
//! assert!(!handle.is_unsatisfied());
//! let saber = handle.get_as::<dyn Saber>()?;
//! ```

pub mod bean;
pub mod error;
pub mod instance;
pub mod metadata;
pub mod qualifier;
pub mod resolver;
pub mod types;

pub use bean::{BeanDescriptor, ConstructionStrategy, InjectionPoint};
pub use error::{BoxError, ConstructionError, ResolutionError, ResolutionResult};
pub use instance::InstanceHandle;
pub use metadata::{
    ConstructionBackend, ConstructorDescriptor, FactoryDescriptor, MetadataProvider,
    ParameterDescriptor, ParameterKind, QualifierTarget,
};
pub use qualifier::{Qualifier, QualifierSet, ANY_TAG, DEFAULT_TAG, NAMED_TAG};
pub use resolver::{ResolutionKey, ResolutionStack, Resolver};
pub use types::{Args, BeanValue, TypeKey, TypeKind};
