//! Link-time discovery of type registrations
//!
//! Any crate linked into the final binary can contribute types, factories and
//! implementations without a central list:
//!
//! ```rust,ignore
//! use jedi_registry::{Constructor, TypeRegistration, TypeRegistry};
//!
//! inventory::submit! {
//!     TypeRegistration::new("sabers", register_sabers)
//! }
//!
//! fn register_sabers(registry: &mut TypeRegistry) {
//!     registry.register_type::<Common>().constructor(Constructor::from_fn(|| Common));
//! }
//! ```
//!
//! [`TypeRegistry::discover`] applies every submission in priority order.

use tracing::{debug, info};

use crate::registry::TypeRegistry;

/// A group of registrations submitted through `inventory::submit!`
pub struct TypeRegistration {
    /// Name of the registration group, for diagnostics
    pub name: &'static str,

    /// Adds the group's types and factories to a registry
    pub register_fn: fn(&mut TypeRegistry),

    /// Application order (lower = earlier, default = 100)
    pub priority: u32,
}

impl TypeRegistration {
    pub const fn new(name: &'static str, register_fn: fn(&mut TypeRegistry)) -> Self {
        Self {
            name,
            register_fn,
            priority: 100,
        }
    }

    pub const fn with_priority(name: &'static str, register_fn: fn(&mut TypeRegistry), priority: u32) -> Self {
        Self {
            name,
            register_fn,
            priority,
        }
    }
}

inventory::collect!(TypeRegistration);

/// Every submitted registration, sorted by priority
///
/// The sort is stable, so equal priorities keep link order.
pub fn discovered_registrations() -> Vec<&'static TypeRegistration> {
    let mut registrations: Vec<&'static TypeRegistration> = inventory::iter::<TypeRegistration>().collect();
    registrations.sort_by_key(|r| r.priority);
    registrations
}

pub fn discovered_registration_count() -> usize {
    inventory::iter::<TypeRegistration>().count()
}

pub fn list_discovered_registrations() -> Vec<&'static str> {
    discovered_registrations().into_iter().map(|r| r.name).collect()
}

impl TypeRegistry {
    /// A registry populated from every discovered registration
    pub fn discover() -> Self {
        let mut registry = Self::new();
        registry.apply_discovered();
        registry
    }

    /// Apply every discovered registration; returns how many were applied
    pub fn apply_discovered(&mut self) -> usize {
        let registrations = discovered_registrations();
        info!("Discovered {} type registrations via inventory", registrations.len());

        for registration in &registrations {
            debug!(
                "Applying registration '{}' (priority: {})",
                registration.name, registration.priority
            );
            (registration.register_fn)(self);
        }

        info!(
            "Registry holds {} types and {} factories after discovery",
            self.registered_types().len(),
            self.factory_count()
        );
        registrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Constructor, Factory};
    use jedi_di::{MetadataProvider, QualifierSet, TypeKey};
    use std::sync::Arc;

    struct Droid;

    inventory::submit! {
        TypeRegistration::new("test_droids", register_droids)
    }

    inventory::submit! {
        TypeRegistration::with_priority("test_early", register_designation, 10)
    }

    fn register_droids(registry: &mut TypeRegistry) {
        registry.register_type::<Droid>().constructor(Constructor::from_fn(|| Droid));
    }

    fn register_designation(registry: &mut TypeRegistry) {
        registry.register_factory(Factory::<String>::new("designation", |_| Ok(Arc::new("R2-D2".to_string()))));
    }

    #[test]
    fn test_discovered_registrations_include_test_groups() {
        let names = list_discovered_registrations();
        assert!(names.contains(&"test_droids"));
        assert!(names.contains(&"test_early"));
        assert!(discovered_registration_count() >= 2);
    }

    #[test]
    fn test_registrations_sorted_by_priority() {
        let registrations = discovered_registrations();
        assert!(registrations.windows(2).all(|w| w[0].priority <= w[1].priority));

        let early = registrations.iter().position(|r| r.name == "test_early");
        let droids = registrations.iter().position(|r| r.name == "test_droids");
        assert!(early < droids);
    }

    #[test]
    fn test_discover_applies_registrations() {
        let registry = TypeRegistry::discover();
        assert!(registry.contains(&TypeKey::of::<Droid>()));
        assert_eq!(
            registry
                .factory_methods_returning(&TypeKey::of::<String>(), &QualifierSet::universal())
                .len(),
            1
        );
    }
}
