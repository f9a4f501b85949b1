//! Static type registry
//!
//! [`TypeRegistry`] records, ahead of resolution, everything the resolver asks
//! about: which types are abstract, what implements them, which constructors
//! and factories exist and how to call them. It implements both
//! [`MetadataProvider`] and [`ConstructionBackend`].
//!
//! ```rust,ignore
//! let mut registry = TypeRegistry::new();
//! registry.register_abstract::<dyn Saber>();
//! registry
//!     .register_type::<LightSaber>()
//!     .qualified(Qualifier::new("Light"))
//!     .implements::<dyn Saber>(|s| s)
//!     .constructor(Constructor::from_fn(|| LightSaber));
//! registry.register_factory(Factory::<String>::new("greeting", |_| Ok(Arc::new("hi".into()))));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use jedi_di::{
    Args, BeanValue, BoxError, ConstructionBackend, ConstructionError, ConstructorDescriptor,
    FactoryDescriptor, MetadataProvider, ParameterDescriptor, Qualifier, QualifierSet,
    QualifierTarget, TypeKey, TypeKind,
};
use tracing::debug;

type ConstructorFn = Arc<dyn Fn(&Args) -> Result<BeanValue, BoxError> + Send + Sync>;
type FactoryFn = Arc<dyn Fn(Option<&BeanValue>, &Args) -> Result<BeanValue, BoxError> + Send + Sync>;
type UpcastFn = Arc<dyn Fn(&BeanValue) -> Result<BeanValue, BoxError> + Send + Sync>;

fn constructor_fn<F>(f: F) -> ConstructorFn
where
    F: Fn(&Args) -> Result<BeanValue, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn factory_fn<F>(f: F) -> FactoryFn
where
    F: Fn(Option<&BeanValue>, &Args) -> Result<BeanValue, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn upcast_fn<F>(f: F) -> UpcastFn
where
    F: Fn(&BeanValue) -> Result<BeanValue, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn dependency(ty: TypeKey, qualifiers: impl IntoIterator<Item = Qualifier>) -> ParameterDescriptor {
    ParameterDescriptor::dependency(ty, QualifierSet::with_universal_tags(qualifiers))
}

// ============================================================================
// Constructors and factories
// ============================================================================

/// A constructor for `T` and the parameters it declares
pub struct Constructor<T> {
    parameters: Vec<ParameterDescriptor>,
    injectable: bool,
    build: ConstructorFn,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Constructor<T> {
    /// Constructor reading its arguments from `Args` in declaration order
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            injectable: false,
            build: constructor_fn(move |args: &Args| build(args).map(BeanValue::of)),
            _marker: PhantomData,
        }
    }

    /// Infallible constructor without parameters
    pub fn from_fn<F>(build: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move |_| Ok(build()))
    }

    /// Declare an unqualified dependency on `P`
    pub fn param<P: ?Sized + 'static>(self) -> Self {
        self.qualified_param::<P>([])
    }

    /// Declare a dependency on `P` carrying `qualifiers`
    pub fn qualified_param<P: ?Sized + 'static>(mut self, qualifiers: impl IntoIterator<Item = Qualifier>) -> Self {
        self.parameters.push(dependency(TypeKey::of::<P>(), qualifiers));
        self
    }

    /// Declare a back-reference to the enclosing `P`
    ///
    /// The parameter is never resolved and the constructor receives no argument
    /// for it.
    pub fn enclosing_scope<P: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(ParameterDescriptor::enclosing_scope(TypeKey::of::<P>()));
        self
    }

    /// Mark as the constructor to use when several are declared
    pub fn injectable(mut self) -> Self {
        self.injectable = true;
        self
    }
}

/// A factory producing `Arc<R>`, free or bound to an owning instance
pub struct Factory<R: ?Sized> {
    name: &'static str,
    owner: Option<TypeKey>,
    parameters: Vec<ParameterDescriptor>,
    qualifiers: Vec<Qualifier>,
    produce: FactoryFn,
    _marker: PhantomData<fn() -> Arc<R>>,
}

impl<R: ?Sized + Send + Sync + 'static> Factory<R> {
    /// A free factory function
    pub fn new<F>(name: &'static str, produce: F) -> Self
    where
        F: Fn(&Args) -> Result<Arc<R>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            owner: None,
            parameters: Vec::new(),
            qualifiers: Vec::new(),
            produce: factory_fn(move |_owner: Option<&BeanValue>, args: &Args| produce(args).map(BeanValue::new)),
            _marker: PhantomData,
        }
    }

    /// A factory method called on the resolved instance of `O`
    pub fn method<O, F>(name: &'static str, produce: F) -> Self
    where
        O: Send + Sync + 'static,
        F: Fn(Arc<O>, &Args) -> Result<Arc<R>, BoxError> + Send + Sync + 'static,
    {
        let owner_name = std::any::type_name::<O>();
        Self {
            name,
            owner: Some(TypeKey::of::<O>()),
            parameters: Vec::new(),
            qualifiers: Vec::new(),
            produce: factory_fn(move |owner: Option<&BeanValue>, args: &Args| {
                let owner = owner
                    .ok_or_else(|| BoxError::from(format!("factory {} called without an {} receiver", name, owner_name)))?
                    .downcast::<O>()?;
                produce(owner, args).map(BeanValue::new)
            }),
            _marker: PhantomData,
        }
    }

    pub fn param<P: ?Sized + 'static>(self) -> Self {
        self.qualified_param::<P>([])
    }

    pub fn qualified_param<P: ?Sized + 'static>(mut self, qualifiers: impl IntoIterator<Item = Qualifier>) -> Self {
        self.parameters.push(dependency(TypeKey::of::<P>(), qualifiers));
        self
    }

    /// Attach a qualifier to the produced bean
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }
}

// ============================================================================
// Registry
// ============================================================================

struct RegisteredConstructor {
    descriptor: ConstructorDescriptor,
    build: ConstructorFn,
}

struct TypeEntry {
    kind: TypeKind,
    qualifiers: QualifierSet,
    constructors: Vec<RegisteredConstructor>,
}

impl TypeEntry {
    fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            qualifiers: QualifierSet::universal(),
            constructors: Vec::new(),
        }
    }
}

struct RegisteredFactory {
    descriptor: FactoryDescriptor,
    produce: FactoryFn,
}

/// Types, implementations, constructors and factories known ahead of resolution
pub struct TypeRegistry {
    types: HashMap<TypeKey, TypeEntry>,
    order: Vec<TypeKey>,
    implementations: HashMap<TypeKey, Vec<TypeKey>>,
    factories: Vec<RegisteredFactory>,
    upcasts: HashMap<(TypeKey, TypeKey), UpcastFn>,
}

impl TypeRegistry {
    /// An empty registry with every scalar type declared primitive
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
            order: Vec::new(),
            implementations: HashMap::new(),
            factories: Vec::new(),
            upcasts: HashMap::new(),
        };
        registry
            .register_primitive::<bool>()
            .register_primitive::<char>()
            .register_primitive::<i8>()
            .register_primitive::<i16>()
            .register_primitive::<i32>()
            .register_primitive::<i64>()
            .register_primitive::<i128>()
            .register_primitive::<isize>()
            .register_primitive::<u8>()
            .register_primitive::<u16>()
            .register_primitive::<u32>()
            .register_primitive::<u64>()
            .register_primitive::<u128>()
            .register_primitive::<usize>()
            .register_primitive::<f32>()
            .register_primitive::<f64>();
        registry
    }

    fn entry(&mut self, key: TypeKey, kind: TypeKind) -> &mut TypeEntry {
        if !self.types.contains_key(&key) {
            self.order.push(key);
        }
        let entry = self.types.entry(key).or_insert_with(|| TypeEntry::new(kind));
        entry.kind = kind;
        entry
    }

    /// Declare `A` as abstract; usually a `dyn Trait`
    pub fn register_abstract<A: ?Sized + 'static>(&mut self) -> &mut Self {
        let key = TypeKey::of::<A>();
        debug!(ty = %key, "registered abstract type");
        self.entry(key, TypeKind::Abstract);
        self
    }

    /// Declare `P` as primitive; it is then only resolvable through a factory
    pub fn register_primitive<P: ?Sized + 'static>(&mut self) -> &mut Self {
        self.entry(TypeKey::of::<P>(), TypeKind::Primitive);
        self
    }

    /// Declare the concrete type `T` and describe it through the returned builder
    pub fn register_type<T: Send + Sync + 'static>(&mut self) -> TypeBuilder<'_, T> {
        let key = TypeKey::of::<T>();
        debug!(ty = %key, "registered concrete type");
        self.entry(key, TypeKind::Concrete);
        TypeBuilder {
            registry: self,
            key,
            _marker: PhantomData,
        }
    }

    /// Register a factory producing `R`
    pub fn register_factory<R: ?Sized + Send + Sync + 'static>(&mut self, factory: Factory<R>) -> &mut Self {
        let descriptor = FactoryDescriptor {
            id: self.factories.len(),
            name: factory.name,
            returns: TypeKey::of::<R>(),
            owner: factory.owner,
            parameters: factory.parameters,
            qualifiers: QualifierSet::with_universal_tags(factory.qualifiers),
        };
        debug!(factory = %descriptor, returns = %descriptor.returns, "registered factory");
        self.factories.push(RegisteredFactory {
            descriptor,
            produce: factory.produce,
        });
        self
    }

    /// Registered types in registration order, primitives excluded
    pub fn registered_types(&self) -> Vec<(TypeKey, TypeKind)> {
        self.order
            .iter()
            .filter_map(|key| self.types.get(key).map(|entry| (*key, entry.kind)))
            .filter(|(_, kind)| *kind != TypeKind::Primitive)
            .collect()
    }

    pub fn contains(&self, ty: &TypeKey) -> bool {
        self.types.contains_key(ty)
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    fn find_factory(&self, factory: &FactoryDescriptor) -> Option<&RegisteredFactory> {
        self.factories
            .get(factory.id)
            .filter(|registered| registered.descriptor.returns == factory.returns)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.order.len())
            .field("factories", &self.factories.len())
            .field("upcasts", &self.upcasts.len())
            .finish()
    }
}

/// Fluent description of one concrete type
pub struct TypeBuilder<'a, T> {
    registry: &'a mut TypeRegistry,
    key: TypeKey,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> TypeBuilder<'a, T> {
    fn entry(&mut self) -> &mut TypeEntry {
        self.registry.entry(self.key, TypeKind::Concrete)
    }

    /// Attach a qualifier to the type
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        let entry = self.entry();
        entry.qualifiers = entry.qualifiers.union(&QualifierSet::from(qualifier));
        self
    }

    /// Record that `T` satisfies the abstract type `A`
    ///
    /// `cast` converts the concrete value into the abstract view, typically
    /// `|value| value` with the unsizing coercion doing the work.
    pub fn implements<A: ?Sized + Send + Sync + 'static>(self, cast: fn(Arc<T>) -> Arc<A>) -> Self {
        let contract = TypeKey::of::<A>();
        if !self.registry.contains(&contract) {
            self.registry.entry(contract, TypeKind::Abstract);
        }
        let implementations = self.registry.implementations.entry(contract).or_default();
        if !implementations.contains(&self.key) {
            implementations.push(self.key);
        }
        self.registry.upcasts.insert(
            (self.key, contract),
            upcast_fn(move |value: &BeanValue| Ok(BeanValue::new(cast(value.downcast::<T>()?)))),
        );
        self
    }

    /// Add a constructor; declaration order is preserved
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        let owner = self.key;
        let entry = self.entry();
        let descriptor = ConstructorDescriptor {
            owner,
            index: entry.constructors.len(),
            parameters: constructor.parameters,
            injectable: constructor.injectable,
        };
        entry.constructors.push(RegisteredConstructor {
            descriptor,
            build: constructor.build,
        });
        self
    }
}

// ============================================================================
// Boundary trait implementations
// ============================================================================

impl MetadataProvider for TypeRegistry {
    fn type_kind(&self, ty: &TypeKey) -> TypeKind {
        self.types
            .get(ty)
            .map(|entry| entry.kind)
            .unwrap_or(TypeKind::Concrete)
    }

    fn implementations_of(&self, ty: &TypeKey) -> Vec<TypeKey> {
        self.implementations.get(ty).cloned().unwrap_or_default()
    }

    fn factory_methods_returning(&self, ty: &TypeKey, filter: &QualifierSet) -> Vec<FactoryDescriptor> {
        self.factories
            .iter()
            .map(|registered| &registered.descriptor)
            .filter(|factory| &factory.returns == ty)
            .filter(|factory| QualifierSet::matches(&factory.qualifiers, filter))
            .cloned()
            .collect()
    }

    fn qualifiers_of(&self, target: QualifierTarget<'_>) -> QualifierSet {
        match target {
            QualifierTarget::Type(ty) => self
                .types
                .get(ty)
                .map(|entry| entry.qualifiers.clone())
                .unwrap_or_default(),
            QualifierTarget::Parameter(param) => param.qualifiers.clone(),
            QualifierTarget::Factory(factory) => factory.qualifiers.clone(),
        }
    }

    fn declared_constructors(&self, ty: &TypeKey) -> Vec<ConstructorDescriptor> {
        self.types
            .get(ty)
            .map(|entry| {
                entry
                    .constructors
                    .iter()
                    .map(|registered| registered.descriptor.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ConstructionBackend for TypeRegistry {
    fn invoke_constructor(
        &self,
        constructor: &ConstructorDescriptor,
        args: Args,
    ) -> Result<BeanValue, ConstructionError> {
        let owner = constructor.owner.name();
        let registered = self
            .types
            .get(&constructor.owner)
            .and_then(|entry| entry.constructors.get(constructor.index))
            .ok_or_else(|| ConstructionError::new(owner, format!("constructor {} is not registered", constructor)))?;
        (registered.build)(&args).map_err(|source| ConstructionError::new(owner, source))
    }

    fn invoke_factory(
        &self,
        factory: &FactoryDescriptor,
        owner: Option<BeanValue>,
        args: Args,
    ) -> Result<BeanValue, ConstructionError> {
        let returns = factory.returns.name();
        let registered = self
            .find_factory(factory)
            .ok_or_else(|| ConstructionError::new(returns, format!("factory {} is not registered", factory)))?;
        (registered.produce)(owner.as_ref(), &args).map_err(|source| ConstructionError::new(returns, source))
    }

    fn upcast(&self, value: BeanValue, from: &TypeKey, to: &TypeKey) -> Result<BeanValue, ConstructionError> {
        let cast = self
            .upcasts
            .get(&(*from, *to))
            .ok_or_else(|| ConstructionError::new(from.name(), format!("no conversion from {} to {} is registered", from, to)))?;
        cast(&value).map_err(|source| ConstructionError::new(from.name(), source))
    }
}
