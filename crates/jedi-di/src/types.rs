//! Type keys and type-erased values
//!
//! Values travel through the resolver as [`BeanValue`]: an `Arc<T>` erased
//! behind `Arc<dyn Any>`. Storing the `Arc<T>` itself (rather than `T`) lets the
//! same representation carry concrete types and `dyn Trait` views alike.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ResolutionError, ResolutionResult};

/// Opaque identifier for a requested contract, abstract or concrete
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`; works for `dyn Trait` as well as sized types
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment without generic arguments or a `dyn ` prefix
    pub fn simple_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        let base = base.trim_start_matches("dyn ");
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How the resolver must treat a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Trait object or other contract satisfied only through implementations
    Abstract,
    /// A type built by a constructor or a factory
    Concrete,
    /// A scalar that is never resolved through constructors
    Primitive,
}

/// A type-erased, cheaply cloneable value produced by a bean
#[derive(Clone)]
pub struct BeanValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl BeanValue {
    /// Wrap an `Arc<T>`; `T` may be a trait object
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap an owned value
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Recover the `Arc<T>` this value was created from
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Arc<T>> {
        self.inner
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| ResolutionError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual: self.type_name,
            })
    }

    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.inner.is::<Arc<T>>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both values share the same allocation
    pub fn ptr_eq(&self, other: &BeanValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for BeanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanValue")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Ordered, already-resolved arguments for a constructor or factory call
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<BeanValue>,
}

impl Args {
    pub fn new(values: Vec<BeanValue>) -> Self {
        Self { values }
    }

    /// Typed access to the argument at `index`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> ResolutionResult<Arc<T>> {
        let value = self
            .values
            .get(index)
            .ok_or(ResolutionError::MissingArgument {
                index,
                expected: std::any::type_name::<T>(),
            })?;
        value.downcast::<T>()
    }

    pub fn value(&self, index: usize) -> Option<&BeanValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
