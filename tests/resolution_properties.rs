//! End-to-end resolution properties
//!
//! Default construction, unsatisfied and ambiguous abstractions, constructor
//! ambiguity and cache sharing, checked through the `Jedi` container.

use std::sync::Arc;

use jedi::{Constructor, Jedi, QualifierSet, TypeKey, TypeRegistry};
use proptest::prelude::*;

// ============================================================================
// Independent and dependent types
// ============================================================================

struct Independent;

#[test]
fn test_default_construction_path() {
    let mut registry = TypeRegistry::new();
    registry
        .register_type::<Independent>()
        .constructor(Constructor::from_fn(|| Independent));
    let jedi = Jedi::new(registry);

    let instance = jedi.select::<Independent>(QualifierSet::universal()).unwrap();
    assert!(!instance.is_unsatisfied());
    assert!(instance.get_as::<Independent>().is_ok());
}

trait Dependency: Send + Sync {}

#[derive(Debug)]
struct Dependent;

#[test]
fn test_abstract_without_implementation() {
    let mut registry = TypeRegistry::new();
    registry.register_abstract::<dyn Dependency>();
    let jedi = Jedi::new(registry);

    let instance = jedi.select::<dyn Dependency>(QualifierSet::universal()).unwrap();
    assert!(instance.is_unsatisfied());
    assert!(instance.get().unwrap_err().is_unsatisfied());
}

#[test]
fn test_unresolvable_dependency() {
    let mut registry = TypeRegistry::new();
    registry.register_abstract::<dyn Dependency>();
    registry
        .register_type::<Dependent>()
        .constructor(Constructor::new(|_| Ok(Dependent)).param::<dyn Dependency>());
    let jedi = Jedi::new(registry);

    let err = jedi.get_bean::<Dependent>(QualifierSet::universal()).unwrap_err();
    assert!(err.is_unsatisfied());
    assert!(err
        .to_string()
        .contains("No qualified bean found for type dyn resolution_properties::Dependency"));
}

struct Plain;
struct Overloaded;
struct Marked;

#[test]
fn test_two_unmarked_constructors() {
    let mut registry = TypeRegistry::new();
    registry.register_type::<Plain>().constructor(Constructor::from_fn(|| Plain));
    registry
        .register_type::<Overloaded>()
        .constructor(Constructor::from_fn(|| Overloaded))
        .constructor(Constructor::new(|_| Ok(Overloaded)).param::<Plain>());
    let jedi = Jedi::new(registry);

    let err = jedi.select::<Overloaded>(QualifierSet::universal()).unwrap_err();
    assert!(err.is_ambiguous());
    assert!(err.to_string().contains("Ambiguous constructors"));
}

#[test]
fn test_marked_constructor_with_resolvable_dependency() {
    let mut registry = TypeRegistry::new();
    registry.register_type::<Plain>().constructor(Constructor::from_fn(|| Plain));
    registry
        .register_type::<Marked>()
        .constructor(Constructor::from_fn(|| Marked))
        .constructor(Constructor::new(|_| Ok(Marked)).param::<Plain>().injectable());
    let jedi = Jedi::new(registry);

    let instance = jedi.select::<Marked>(QualifierSet::universal()).unwrap();
    assert!(instance.get().is_ok());
    assert_eq!(instance.bean().unwrap().injection_points().len(), 1);
}

// ============================================================================
// Complex abstract graph
// ============================================================================
//
//     |----------------------------
//     |                           |
//     |                           v
//   start ----> A -----> E -----> C
//     |         |        | \     /
//     |         v        |  \   /
//     |-------->D        |   \ /
//     |         ^        v    v
//     |         |--------F    B
//     |                       ^
//     |                       |
//     |------------------------

mod graph {
    use std::sync::Arc;

    use jedi::{Constructor, Jedi, TypeRegistry};

    pub trait A: Send + Sync {
        fn e(&self) -> Arc<dyn E>;
        fn d(&self) -> Arc<dyn D>;
    }
    pub struct B;
    pub trait C: Send + Sync {
        fn b(&self) -> Arc<B>;
    }
    pub trait D: Send + Sync {}
    pub trait E: Send + Sync {
        fn b(&self) -> Arc<B>;
        fn c(&self) -> Arc<dyn C>;
        fn f(&self) -> Arc<F>;
    }

    pub struct Start {
        pub a: Arc<dyn A>,
        pub b: Arc<B>,
        pub c: Arc<dyn C>,
        pub d: Arc<dyn D>,
    }

    pub struct GA {
        e: Arc<dyn E>,
        d: Arc<dyn D>,
    }

    impl A for GA {
        fn e(&self) -> Arc<dyn E> {
            Arc::clone(&self.e)
        }
        fn d(&self) -> Arc<dyn D> {
            Arc::clone(&self.d)
        }
    }

    pub struct HE {
        b: Arc<B>,
        c: Arc<dyn C>,
        f: Arc<F>,
    }

    impl E for HE {
        fn b(&self) -> Arc<B> {
            Arc::clone(&self.b)
        }
        fn c(&self) -> Arc<dyn C> {
            Arc::clone(&self.c)
        }
        fn f(&self) -> Arc<F> {
            Arc::clone(&self.f)
        }
    }

    pub struct IC {
        b: Arc<B>,
    }

    impl C for IC {
        fn b(&self) -> Arc<B> {
            Arc::clone(&self.b)
        }
    }

    pub struct F {
        pub d: Arc<dyn D>,
    }

    pub struct JD;

    impl D for JD {}

    pub fn jedi() -> Jedi {
        let mut registry = TypeRegistry::new();
        registry.register_type::<B>().constructor(Constructor::from_fn(|| B));
        registry
            .register_type::<JD>()
            .implements::<dyn D>(|d| d)
            .constructor(Constructor::from_fn(|| JD));
        registry.register_type::<F>().constructor(
            Constructor::new(|args| Ok(F { d: args.get::<dyn D>(0)? })).param::<dyn D>(),
        );
        registry
            .register_type::<IC>()
            .implements::<dyn C>(|c| c)
            .constructor(Constructor::new(|args| Ok(IC { b: args.get::<B>(0)? })).param::<B>());
        registry
            .register_type::<HE>()
            .implements::<dyn E>(|e| e)
            .constructor(
                Constructor::new(|args| {
                    Ok(HE {
                        b: args.get::<B>(0)?,
                        c: args.get::<dyn C>(1)?,
                        f: args.get::<F>(2)?,
                    })
                })
                .param::<B>()
                .param::<dyn C>()
                .param::<F>(),
            );
        registry
            .register_type::<GA>()
            .implements::<dyn A>(|a| a)
            .constructor(
                Constructor::new(|args| {
                    Ok(GA {
                        e: args.get::<dyn E>(0)?,
                        d: args.get::<dyn D>(1)?,
                    })
                })
                .param::<dyn E>()
                .param::<dyn D>(),
            );
        registry.register_type::<Start>().constructor(
            Constructor::new(|args| {
                Ok(Start {
                    a: args.get::<dyn A>(0)?,
                    b: args.get::<B>(1)?,
                    c: args.get::<dyn C>(2)?,
                    d: args.get::<dyn D>(3)?,
                })
            })
            .param::<dyn A>()
            .param::<B>()
            .param::<dyn C>()
            .param::<dyn D>(),
        );
        Jedi::new(registry)
    }
}

#[test]
fn test_resolves_a_dependency_graph() {
    let jedi = graph::jedi();
    let start = jedi.get_bean::<graph::Start>(QualifierSet::universal()).unwrap();

    let e = start.a.e();
    let _ = e.b();
    let _ = e.c().b();
    let _ = &e.f().d;
    let _ = start.a.d();
    let _ = &start.b;
    let _ = start.c.b();
    let _ = &start.d;
}

#[test]
fn test_caches_visited_nodes() {
    let jedi = graph::jedi();
    let instance = jedi.select::<graph::Start>(QualifierSet::universal()).unwrap();
    let start_bean = instance.bean().unwrap();

    let a_bean = start_bean.injection_points()[0].bean();
    let e_bean = a_bean.injection_points()[0].bean();
    let b_via_e = e_bean.injection_points()[0].bean();
    let b_via_start = start_bean.injection_points()[1].bean();
    assert!(Arc::ptr_eq(b_via_e, b_via_start));

    let b_bean = jedi
        .select::<graph::B>(QualifierSet::universal())
        .unwrap()
        .bean()
        .unwrap();
    assert!(Arc::ptr_eq(b_via_e, &b_bean));
}

#[test]
fn test_repeated_select_returns_same_handle() {
    let jedi = graph::jedi();
    let first = jedi.select::<graph::Start>(QualifierSet::universal()).unwrap();
    let second = jedi.select::<graph::Start>(QualifierSet::universal()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let d_first = jedi.select::<dyn graph::D>(QualifierSet::universal()).unwrap();
    let d_second = jedi.resolver().resolve(TypeKey::of::<dyn graph::D>(), QualifierSet::universal()).unwrap();
    assert!(Arc::ptr_eq(&d_first, &d_second));
}

#[test]
fn test_validate_whole_graph() {
    let jedi = graph::jedi();
    let report = jedi.validate();
    assert!(report.is_ok());
    assert_eq!(report.checked, jedi.registry().registered_types().len());
}

proptest! {
    #[test]
    fn prop_any_resolution_order_shares_handles(order in prop::collection::vec(0usize..4, 1..16)) {
        let jedi = graph::jedi();
        let mut first_seen: Vec<Option<Arc<jedi::InstanceHandle>>> = vec![None; 4];

        for index in order {
            let handle = match index {
                0 => jedi.select::<graph::Start>(QualifierSet::universal()),
                1 => jedi.select::<dyn graph::A>(QualifierSet::universal()),
                2 => jedi.select::<graph::B>(QualifierSet::universal()),
                _ => jedi.select::<dyn graph::D>(QualifierSet::universal()),
            }
            .unwrap();

            match first_seen[index].clone() {
                Some(previous) => {
                    prop_assert!(Arc::ptr_eq(&previous, &handle));
                }
                None => {
                    first_seen[index] = Some(handle);
                }
            }
        }
    }
}
