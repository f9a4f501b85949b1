//! Static type registry for the jedi resolver
//!
//! [`TypeRegistry`] is a [`jedi_di::MetadataProvider`] and
//! [`jedi_di::ConstructionBackend`] built from explicit registrations, either
//! made directly or submitted from any linked crate through
//! [`TypeRegistration`] and `inventory`.

pub mod registration;
pub mod registry;

pub use registration::{
    discovered_registration_count, discovered_registrations, list_discovered_registrations,
    TypeRegistration,
};
pub use registry::{Constructor, Factory, TypeBuilder, TypeRegistry};

// Re-exported so registrations can be submitted without a direct dependency.
pub use inventory;
