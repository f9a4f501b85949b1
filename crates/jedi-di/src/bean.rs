//! Bean descriptors and injection points
//!
//! A [`BeanDescriptor`] is one buildable recipe for a type: a constructor or a
//! factory plus the already-resolved descriptors for each of its parameters.
//! Calling [`BeanDescriptor::create`] walks the injection points depth first,
//! then hands the collected arguments to the construction backend.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::ResolutionResult;
use crate::instance::InstanceHandle;
use crate::metadata::{ConstructionBackend, ConstructorDescriptor, FactoryDescriptor};
use crate::qualifier::QualifierSet;
use crate::types::{Args, BeanValue, TypeKey};

/// How a bean produces its value; fixed at creation
pub enum ConstructionStrategy {
    Constructor(ConstructorDescriptor),
    Factory {
        factory: FactoryDescriptor,
        /// Handle for the instance that owns the factory, if it has one
        owner: Option<Arc<InstanceHandle>>,
    },
}

impl fmt::Debug for ConstructionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor(ctor) => write!(f, "Constructor({})", ctor),
            Self::Factory { factory, .. } => write!(f, "Factory({})", factory),
        }
    }
}

/// A resolved parameter slot
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    requested_type: TypeKey,
    qualifiers: QualifierSet,
    bean: Arc<BeanDescriptor>,
}

impl InjectionPoint {
    pub fn new(requested_type: TypeKey, qualifiers: QualifierSet, bean: Arc<BeanDescriptor>) -> Self {
        Self {
            requested_type,
            qualifiers,
            bean,
        }
    }

    /// Type declared by the parameter, possibly abstract
    pub fn requested_type(&self) -> &TypeKey {
        &self.requested_type
    }

    /// Qualifiers requested by the parameter
    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    /// Bean chosen to satisfy the parameter
    pub fn bean(&self) -> &Arc<BeanDescriptor> {
        &self.bean
    }

    fn produce(&self, backend: &dyn ConstructionBackend) -> ResolutionResult<BeanValue> {
        let value = self.bean.create()?;
        if self.bean.bean_type() == &self.requested_type {
            return Ok(value);
        }
        Ok(backend.upcast(value, self.bean.bean_type(), &self.requested_type)?)
    }
}

/// Immutable recipe for producing a value of one type
pub struct BeanDescriptor {
    bean_type: TypeKey,
    qualifiers: QualifierSet,
    injection_points: Vec<InjectionPoint>,
    strategy: ConstructionStrategy,
    backend: Arc<dyn ConstructionBackend>,
}

impl BeanDescriptor {
    /// Bean built through `constructor` from the given injection points
    pub fn from_constructor(
        bean_type: TypeKey,
        qualifiers: QualifierSet,
        constructor: ConstructorDescriptor,
        injection_points: Vec<InjectionPoint>,
        backend: Arc<dyn ConstructionBackend>,
    ) -> Self {
        Self {
            bean_type,
            qualifiers,
            injection_points,
            strategy: ConstructionStrategy::Constructor(constructor),
            backend,
        }
    }

    /// Bean produced by calling `factory`, on `owner` when it has one
    pub fn from_factory(
        factory: FactoryDescriptor,
        qualifiers: QualifierSet,
        owner: Option<Arc<InstanceHandle>>,
        injection_points: Vec<InjectionPoint>,
        backend: Arc<dyn ConstructionBackend>,
    ) -> Self {
        Self {
            bean_type: factory.returns,
            qualifiers,
            injection_points,
            strategy: ConstructionStrategy::Factory { factory, owner },
            backend,
        }
    }

    pub fn bean_type(&self) -> &TypeKey {
        &self.bean_type
    }

    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    pub fn strategy(&self) -> &ConstructionStrategy {
        &self.strategy
    }

    pub fn is_factory(&self) -> bool {
        matches!(self.strategy, ConstructionStrategy::Factory { .. })
    }

    /// Produce a fresh value
    ///
    /// Injection points are created in declaration order before the backend is
    /// invoked. Backend failures surface as `ResolutionError::Construction`.
    pub fn create(&self) -> ResolutionResult<BeanValue> {
        trace!(bean = %self.bean_type, "creating bean");
        let args = self
            .injection_points
            .iter()
            .map(|point| point.produce(self.backend.as_ref()))
            .collect::<ResolutionResult<Vec<_>>>()?;
        let args = Args::new(args);

        let value = match &self.strategy {
            ConstructionStrategy::Constructor(ctor) => self.backend.invoke_constructor(ctor, args)?,
            ConstructionStrategy::Factory { factory, owner } => {
                let receiver = owner.as_ref().map(|handle| handle.get()).transpose()?;
                self.backend.invoke_factory(factory, receiver, args)?
            }
        };
        Ok(value)
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("bean_type", &self.bean_type)
            .field("qualifiers", &self.qualifiers)
            .field("strategy", &self.strategy)
            .field("injection_points", &self.injection_points.len())
            .finish()
    }
}

impl fmt::Display for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Managed Bean [{}] with qualifiers {}", self.bean_type, self.qualifiers)
    }
}
