//! The resolver
//!
//! [`Resolver::resolve`] walks a dependency graph depth first and returns an
//! [`InstanceHandle`] for the requested (type, qualifiers) key. Every handle
//! built along the way is cached for the life of the resolver, so independent
//! parents requiring the same key share one subgraph.
//!
//! Cycle detection uses a [`ResolutionStack`] owned by a single top-level call.
//! Concurrent callers never see each other's in-progress keys.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, debug_span, trace, warn};

use crate::bean::{BeanDescriptor, InjectionPoint};
use crate::error::{ResolutionError, ResolutionResult};
use crate::instance::InstanceHandle;
use crate::metadata::{
    ConstructionBackend, ConstructorDescriptor, FactoryDescriptor, MetadataProvider,
    ParameterDescriptor, QualifierTarget,
};
use crate::qualifier::QualifierSet;
use crate::types::{BeanValue, TypeKey, TypeKind};

/// Cache and cycle-guard key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    ty: TypeKey,
    qualifiers: QualifierSet,
}

impl ResolutionKey {
    pub fn new(ty: TypeKey, qualifiers: QualifierSet) -> Self {
        Self { ty, qualifiers }
    }

    pub fn ty(&self) -> &TypeKey {
        &self.ty
    }

    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.qualifiers)
    }
}

/// Keys currently being resolved by one top-level call
#[derive(Debug, Default)]
pub struct ResolutionStack {
    keys: Vec<ResolutionKey>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `key`, failing if it is already in progress
    pub fn push(&mut self, key: &ResolutionKey) -> ResolutionResult<()> {
        if self.keys.contains(key) {
            let mut path: Vec<&'static str> = self.keys.iter().map(|k| k.ty.name()).collect();
            path.push(key.ty.name());
            warn!(ty = %key.ty, depth = self.keys.len(), "circular dependency detected");
            return Err(ResolutionError::CircularDependency {
                type_name: key.ty.name(),
                path,
            });
        }
        trace!(ty = %key.ty, depth = self.keys.len(), "push");
        self.keys.push(key.clone());
        Ok(())
    }

    pub fn pop(&mut self) -> Option<ResolutionKey> {
        let key = self.keys.pop();
        if let Some(key) = &key {
            trace!(ty = %key.ty, depth = self.keys.len(), "pop");
        }
        key
    }

    pub fn contains(&self, key: &ResolutionKey) -> bool {
        self.keys.contains(key)
    }

    pub fn depth(&self) -> usize {
        self.keys.len()
    }
}

/// How a type is turned into candidates, decided once per key
#[derive(Debug)]
enum Classification {
    Abstract,
    ConcreteWithFactory(FactoryDescriptor),
    ConcreteDefault(ConstructorDescriptor),
    ConcreteWithConstructor(ConstructorDescriptor),
}

/// Resolves types into cached instance handles
pub struct Resolver {
    metadata: Arc<dyn MetadataProvider>,
    backend: Arc<dyn ConstructionBackend>,
    cache: DashMap<ResolutionKey, Arc<InstanceHandle>>,
}

impl Resolver {
    pub fn new(metadata: Arc<dyn MetadataProvider>, backend: Arc<dyn ConstructionBackend>) -> Self {
        Self {
            metadata,
            backend,
            cache: DashMap::new(),
        }
    }

    /// Resolve `ty` with `qualifiers` (universal tags are always included)
    pub fn resolve(&self, ty: TypeKey, qualifiers: QualifierSet) -> ResolutionResult<Arc<InstanceHandle>> {
        let mut stack = ResolutionStack::new();
        self.resolve_in(&mut stack, ResolutionKey::new(ty, qualifiers))
    }

    /// Resolve `T` with `qualifiers`
    pub fn resolve_type<T: ?Sized + 'static>(&self, qualifiers: QualifierSet) -> ResolutionResult<Arc<InstanceHandle>> {
        self.resolve(TypeKey::of::<T>(), qualifiers)
    }

    /// Resolve and materialize in one step
    pub fn get_instance(&self, ty: TypeKey, qualifiers: QualifierSet) -> ResolutionResult<BeanValue> {
        self.resolve(ty, qualifiers)?.get()
    }

    /// Resolve and materialize `T` as `Arc<T>`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, qualifiers: QualifierSet) -> ResolutionResult<Arc<T>> {
        self.resolve_type::<T>(qualifiers)?.get_as::<T>()
    }

    /// Number of cached handles
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, ty: TypeKey, qualifiers: QualifierSet) -> bool {
        self.cache.contains_key(&ResolutionKey::new(ty, qualifiers))
    }

    fn resolve_in(&self, stack: &mut ResolutionStack, key: ResolutionKey) -> ResolutionResult<Arc<InstanceHandle>> {
        if let Some(cached) = self.cache.get(&key) {
            debug!(ty = %key.ty, "cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        stack.push(&key)?;
        let span = debug_span!("resolve", ty = %key.ty);
        let built = span.in_scope(|| self.build_handle(stack, &key));
        stack.pop();

        let handle = Arc::new(built?);
        // Another caller may have finished the same key first; keep its handle.
        let cached = Arc::clone(self.cache.entry(key).or_insert(handle).value());
        Ok(cached)
    }

    fn build_handle(&self, stack: &mut ResolutionStack, key: &ResolutionKey) -> ResolutionResult<InstanceHandle> {
        let classification = self.classify(key)?;
        debug!(ty = %key.ty, ?classification, "classified");

        let candidates = match classification {
            Classification::Abstract => self.abstract_candidates(stack, key)?,
            Classification::ConcreteWithFactory(factory) => vec![self.factory_bean(stack, factory)?],
            Classification::ConcreteDefault(ctor) => vec![Arc::new(BeanDescriptor::from_constructor(
                key.ty,
                self.metadata.qualifiers_of(QualifierTarget::Type(&key.ty)),
                ctor,
                Vec::new(),
                Arc::clone(&self.backend),
            ))],
            Classification::ConcreteWithConstructor(ctor) => {
                let points = self.injection_points(stack, key.ty.name(), &ctor.parameters, true)?;
                vec![Arc::new(BeanDescriptor::from_constructor(
                    key.ty,
                    self.metadata.qualifiers_of(QualifierTarget::Type(&key.ty)),
                    ctor,
                    points,
                    Arc::clone(&self.backend),
                ))]
            }
        };

        Ok(InstanceHandle::new(
            key.ty,
            key.qualifiers.clone(),
            candidates,
            Arc::clone(&self.backend),
        ))
    }

    fn classify(&self, key: &ResolutionKey) -> ResolutionResult<Classification> {
        let kind = self.metadata.type_kind(&key.ty);
        if kind == TypeKind::Abstract {
            return Ok(Classification::Abstract);
        }

        if let Some(factory) = self.select_factory(key)? {
            return Ok(Classification::ConcreteWithFactory(factory));
        }

        if kind == TypeKind::Primitive {
            return Err(ResolutionError::primitive_type(key.ty.name(), &key.qualifiers));
        }

        let constructors = self.metadata.declared_constructors(&key.ty);
        match constructors.as_slice() {
            [] => Err(ResolutionError::no_construction_path(key.ty.name(), &key.qualifiers)),
            [only] if only.is_default() => Ok(Classification::ConcreteDefault(only.clone())),
            [only] => Ok(Classification::ConcreteWithConstructor(only.clone())),
            several => {
                let mut marked = self.metadata.marked_injectable_constructors(&key.ty);
                if marked.len() == 1 {
                    if let Some(ctor) = marked.pop() {
                        return Ok(Classification::ConcreteWithConstructor(ctor));
                    }
                }
                warn!(ty = %key.ty, constructors = several.len(), marked = marked.len(), "ambiguous constructors");
                let listed: Vec<String> = several.iter().map(ToString::to_string).collect();
                Err(ResolutionError::ambiguous_constructors(key.ty.name(), &listed))
            }
        }
    }

    /// Pick the factory producing a concrete type, if any
    fn select_factory(&self, key: &ResolutionKey) -> ResolutionResult<Option<FactoryDescriptor>> {
        let mut factories = self.metadata.factory_methods_returning(&key.ty, &key.qualifiers);
        if factories.len() <= 1 {
            return Ok(factories.pop());
        }

        let bean_name = key.ty.simple_name().to_lowercase();
        let mut named: Vec<&FactoryDescriptor> = factories.iter().filter(|f| f.bean_name() == bean_name).collect();
        if named.len() == 1 {
            if let Some(factory) = named.pop() {
                debug!(ty = %key.ty, factory = %factory, "factory selected by bean name");
                return Ok(Some(factory.clone()));
            }
        }

        warn!(ty = %key.ty, factories = factories.len(), "ambiguous factories");
        let mut message = format!(
            "Ambiguous factories for type {} with qualifiers {}\nPossible dependencies:\n",
            key.ty, key.qualifiers
        );
        for factory in &factories {
            message.push_str(&format!(
                " - Factory [{}] with qualifiers {}\n",
                factory,
                self.metadata.qualifiers_of(QualifierTarget::Factory(factory))
            ));
        }
        Err(ResolutionError::Ambiguous {
            type_name: key.ty.name(),
            message,
        })
    }

    fn abstract_candidates(
        &self,
        stack: &mut ResolutionStack,
        key: &ResolutionKey,
    ) -> ResolutionResult<Vec<Arc<BeanDescriptor>>> {
        let mut candidates = Vec::new();
        for implementation in self.metadata.implementations_of(&key.ty) {
            let handle = self.resolve_in(stack, ResolutionKey::new(implementation, QualifierSet::universal()))?;
            candidates.push(handle.bean()?);
        }
        // Narrowing by the requested qualifiers is left to `find_bean`.
        for factory in self.metadata.factory_methods_returning(&key.ty, &QualifierSet::universal()) {
            candidates.push(self.factory_bean(stack, factory)?);
        }
        debug!(ty = %key.ty, candidates = candidates.len(), "abstract candidates");
        Ok(candidates)
    }

    fn factory_bean(&self, stack: &mut ResolutionStack, factory: FactoryDescriptor) -> ResolutionResult<Arc<BeanDescriptor>> {
        let owner = match factory.owner {
            Some(owner) => Some(self.resolve_in(stack, ResolutionKey::new(owner, QualifierSet::universal()))?),
            None => None,
        };
        let points = self.injection_points(stack, factory.returns.name(), &factory.parameters, false)?;
        let qualifiers = self.metadata.qualifiers_of(QualifierTarget::Factory(&factory));
        Ok(Arc::new(BeanDescriptor::from_factory(
            factory,
            qualifiers,
            owner,
            points,
            Arc::clone(&self.backend),
        )))
    }

    /// One injection point per dependency parameter, in declaration order
    ///
    /// Constructor parameters of a primitive type are rejected outright.
    /// Factory parameters may be primitives produced by other factories.
    fn injection_points(
        &self,
        stack: &mut ResolutionStack,
        owner: &'static str,
        parameters: &[ParameterDescriptor],
        reject_primitives: bool,
    ) -> ResolutionResult<Vec<InjectionPoint>> {
        let mut points = Vec::with_capacity(parameters.len());
        for param in parameters.iter().filter(|p| p.is_dependency()) {
            if reject_primitives && self.metadata.type_kind(&param.ty) == TypeKind::Primitive {
                return Err(ResolutionError::primitive_parameter(param.ty.name(), owner));
            }
            let qualifiers = self.metadata.qualifiers_of(QualifierTarget::Parameter(param));
            let handle = self.resolve_in(stack, ResolutionKey::new(param.ty, qualifiers.clone()))?;
            let bean = handle.find_bean(&qualifiers)?;
            points.push(InjectionPoint::new(param.ty, qualifiers, bean));
        }
        Ok(points)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifier;

    struct Alpha;
    struct Beta;

    fn key<T: 'static>() -> ResolutionKey {
        ResolutionKey::new(TypeKey::of::<T>(), QualifierSet::universal())
    }

    #[test]
    fn test_stack_detects_reentry() {
        let mut stack = ResolutionStack::new();
        stack.push(&key::<Alpha>()).unwrap();
        stack.push(&key::<Beta>()).unwrap();

        let err = stack.push(&key::<Alpha>()).unwrap_err();
        match err {
            ResolutionError::CircularDependency { type_name, path } => {
                assert!(type_name.ends_with("Alpha"));
                assert_eq!(path.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_stack_pop_allows_reentry() {
        let mut stack = ResolutionStack::new();
        stack.push(&key::<Alpha>()).unwrap();
        assert!(stack.pop().is_some());
        assert!(!stack.contains(&key::<Alpha>()));
        stack.push(&key::<Alpha>()).unwrap();
    }

    #[test]
    fn test_qualifiers_are_part_of_the_key() {
        let mut stack = ResolutionStack::new();
        stack.push(&key::<Alpha>()).unwrap();
        let tagged = ResolutionKey::new(TypeKey::of::<Alpha>(), Qualifier::new("Light").into());
        assert!(stack.push(&tagged).is_ok());
    }
}
