//! Boundary capabilities consumed by the resolver
//!
//! [`MetadataProvider`] answers questions about types: which implementations an
//! abstract type has, which factories produce a type, which constructors a type
//! declares and which qualifiers are attached to what. [`ConstructionBackend`]
//! turns a descriptor plus resolved arguments into a value.
//!
//! How the metadata is gathered is up to the implementation. A static registry,
//! generated code or link-time discovery all satisfy the contract.

use std::fmt;

use crate::error::ConstructionError;
use crate::qualifier::QualifierSet;
use crate::types::{Args, BeanValue, TypeKey, TypeKind};

/// What a declared constructor or factory parameter stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A real dependency to be resolved
    Dependency,
    /// A back-reference to an enclosing scope; metadata only, never resolved
    /// and never passed to the constructor
    EnclosingScope,
}

/// One declared parameter of a constructor or factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub ty: TypeKey,
    pub qualifiers: QualifierSet,
    pub kind: ParameterKind,
}

impl ParameterDescriptor {
    pub fn dependency(ty: TypeKey, qualifiers: QualifierSet) -> Self {
        Self {
            ty,
            qualifiers,
            kind: ParameterKind::Dependency,
        }
    }

    pub fn enclosing_scope(ty: TypeKey) -> Self {
        Self {
            ty,
            qualifiers: QualifierSet::universal(),
            kind: ParameterKind::EnclosingScope,
        }
    }

    pub fn is_dependency(&self) -> bool {
        self.kind == ParameterKind::Dependency
    }
}

/// A declared constructor of a concrete type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDescriptor {
    pub owner: TypeKey,
    /// Position among the owner's declared constructors
    pub index: usize,
    pub parameters: Vec<ParameterDescriptor>,
    /// Explicitly marked as the injectable constructor
    pub injectable: bool,
}

impl ConstructorDescriptor {
    /// True when building through this constructor needs no resolved dependency
    pub fn is_default(&self) -> bool {
        match self.parameters.as_slice() {
            [] => true,
            [only] => only.kind == ParameterKind::EnclosingScope,
            _ => false,
        }
    }
}

impl fmt::Display for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.ty.simple_name()).collect();
        write!(f, "{}#{}({})", self.owner.simple_name(), self.index, params.join(", "))
    }
}

/// A producer method or free function returning a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryDescriptor {
    /// Registry-assigned identifier, unique per provider
    pub id: usize,
    pub name: &'static str,
    pub returns: TypeKey,
    /// Type whose instance receives the call; `None` for free functions
    pub owner: Option<TypeKey>,
    pub parameters: Vec<ParameterDescriptor>,
    pub qualifiers: QualifierSet,
}

impl FactoryDescriptor {
    /// Name with a leading `get`/`get_` removed, lowercased
    pub fn bean_name(&self) -> String {
        let name = self
            .name
            .strip_prefix("get_")
            .or_else(|| self.name.strip_prefix("get"))
            .unwrap_or(self.name);
        name.to_lowercase()
    }
}

impl fmt::Display for FactoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}::{}", owner.simple_name(), self.name),
            None => f.write_str(self.name),
        }
    }
}

/// Something qualifiers can be attached to
#[derive(Debug, Clone, Copy)]
pub enum QualifierTarget<'a> {
    Type(&'a TypeKey),
    Parameter(&'a ParameterDescriptor),
    Factory(&'a FactoryDescriptor),
}

/// Query capability over type metadata
pub trait MetadataProvider: Send + Sync {
    /// Whether `ty` is abstract, concrete or primitive
    fn type_kind(&self, ty: &TypeKey) -> TypeKind;

    /// Known implementations of an abstract type, in a stable order
    fn implementations_of(&self, ty: &TypeKey) -> Vec<TypeKey>;

    /// Factories returning `ty` whose qualifiers include every one of `filter`
    fn factory_methods_returning(&self, ty: &TypeKey, filter: &QualifierSet) -> Vec<FactoryDescriptor>;

    /// Qualifiers declared on a type, parameter or factory, universal tags included
    fn qualifiers_of(&self, target: QualifierTarget<'_>) -> QualifierSet;

    /// Constructors declared by `ty`, in declaration order
    fn declared_constructors(&self, ty: &TypeKey) -> Vec<ConstructorDescriptor>;

    /// Constructors explicitly marked injectable
    ///
    /// Returns every marked constructor so callers can tell "none" from
    /// "more than one".
    fn marked_injectable_constructors(&self, ty: &TypeKey) -> Vec<ConstructorDescriptor> {
        self.declared_constructors(ty)
            .into_iter()
            .filter(|c| c.injectable)
            .collect()
    }
}

/// Produces values from descriptors and resolved arguments
pub trait ConstructionBackend: Send + Sync {
    fn invoke_constructor(
        &self,
        constructor: &ConstructorDescriptor,
        args: Args,
    ) -> Result<BeanValue, ConstructionError>;

    fn invoke_factory(
        &self,
        factory: &FactoryDescriptor,
        owner: Option<BeanValue>,
        args: Args,
    ) -> Result<BeanValue, ConstructionError>;

    /// Present a value of type `from` as the abstract type `to`
    fn upcast(&self, value: BeanValue, from: &TypeKey, to: &TypeKey) -> Result<BeanValue, ConstructionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Outer;
    struct Inner;

    fn factory(name: &'static str) -> FactoryDescriptor {
        FactoryDescriptor {
            id: 0,
            name,
            returns: TypeKey::of::<Inner>(),
            owner: None,
            parameters: Vec::new(),
            qualifiers: QualifierSet::universal(),
        }
    }

    #[test]
    fn test_default_constructor_detection() {
        let mut ctor = ConstructorDescriptor {
            owner: TypeKey::of::<Inner>(),
            index: 0,
            parameters: Vec::new(),
            injectable: false,
        };
        assert!(ctor.is_default());

        ctor.parameters.push(ParameterDescriptor::enclosing_scope(TypeKey::of::<Outer>()));
        assert!(ctor.is_default());
        assert_eq!(ctor.parameters.iter().filter(|p| p.is_dependency()).count(), 0);

        ctor.parameters.push(ParameterDescriptor::dependency(
            TypeKey::of::<String>(),
            QualifierSet::universal(),
        ));
        assert!(!ctor.is_default());
        assert_eq!(ctor.parameters.iter().filter(|p| p.is_dependency()).count(), 1);
    }

    #[test]
    fn test_bean_name() {
        assert_eq!(factory("getMsg").bean_name(), "msg");
        assert_eq!(factory("get_msg").bean_name(), "msg");
        assert_eq!(factory("produceMsg").bean_name(), "producemsg");
    }
}
