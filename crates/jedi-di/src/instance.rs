//! Instance handles
//!
//! An [`InstanceHandle`] is the resolver's answer to a (type, qualifiers)
//! query. It holds zero, one or many candidate beans and narrows them with a
//! qualifier filter when a value is requested. The selected bean and the value
//! it produced are latched on first success.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::bean::BeanDescriptor;
use crate::error::{ResolutionError, ResolutionResult};
use crate::metadata::ConstructionBackend;
use crate::qualifier::QualifierSet;
use crate::types::{BeanValue, TypeKey};

/// Candidate beans for one requested (type, qualifiers) pair
pub struct InstanceHandle {
    contract: TypeKey,
    qualifiers: QualifierSet,
    candidates: Vec<Arc<BeanDescriptor>>,
    selected: OnceCell<Arc<BeanDescriptor>>,
    value: OnceCell<BeanValue>,
    backend: Arc<dyn ConstructionBackend>,
}

impl InstanceHandle {
    pub fn new(
        contract: TypeKey,
        qualifiers: QualifierSet,
        candidates: Vec<Arc<BeanDescriptor>>,
        backend: Arc<dyn ConstructionBackend>,
    ) -> Self {
        Self {
            contract,
            qualifiers,
            candidates,
            selected: OnceCell::new(),
            value: OnceCell::new(),
            backend,
        }
    }

    /// The type this handle was requested for
    pub fn contract(&self) -> &TypeKey {
        &self.contract
    }

    /// Qualifiers the handle was requested with
    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    pub fn candidates(&self) -> &[Arc<BeanDescriptor>] {
        &self.candidates
    }

    pub fn is_unsatisfied(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }

    /// Select the bean matching the qualifiers this handle was requested with
    pub fn bean(&self) -> ResolutionResult<Arc<BeanDescriptor>> {
        self.find_bean(&self.qualifiers)
    }

    /// Select the single bean satisfying `qualifiers`
    ///
    /// With exactly one candidate it is returned whatever the qualifiers. Once
    /// a bean has been selected later calls return it without filtering again.
    pub fn find_bean(&self, qualifiers: &QualifierSet) -> ResolutionResult<Arc<BeanDescriptor>> {
        self.selected
            .get_or_try_init(|| self.select(qualifiers))
            .cloned()
    }

    fn select(&self, qualifiers: &QualifierSet) -> ResolutionResult<Arc<BeanDescriptor>> {
        if let [only] = self.candidates.as_slice() {
            return Ok(Arc::clone(only));
        }

        let qualified: Vec<&Arc<BeanDescriptor>> = self
            .candidates
            .iter()
            .filter(|bean| QualifierSet::matches(bean.qualifiers(), qualifiers))
            .collect();

        match qualified.as_slice() {
            [only] => {
                debug!(contract = %self.contract, bean = %only.bean_type(), "qualifiers selected bean");
                Ok(Arc::clone(only))
            }
            [] => Err(ResolutionError::no_qualified_bean(self.contract.name(), qualifiers)),
            several => {
                warn!(contract = %self.contract, candidates = several.len(), "ambiguous resolution");
                Err(ResolutionError::Ambiguous {
                    type_name: self.contract.name(),
                    message: self.ambiguity_message(qualifiers, several),
                })
            }
        }
    }

    fn ambiguity_message(&self, qualifiers: &QualifierSet, remaining: &[&Arc<BeanDescriptor>]) -> String {
        let mut message = format!(
            "Ambiguous dependencies for type {} with qualifiers {}\nPossible dependencies:\n",
            self.contract, qualifiers
        );
        for bean in remaining {
            message.push_str(&format!(" - {}\n", bean));
        }
        message
    }

    /// Materialize the value, creating it on the first call only
    pub fn get(&self) -> ResolutionResult<BeanValue> {
        self.value
            .get_or_try_init(|| -> ResolutionResult<BeanValue> {
                let bean = self.bean()?;
                let value = bean.create()?;
                if bean.bean_type() == &self.contract {
                    return Ok(value);
                }
                Ok(self.backend.upcast(value, bean.bean_type(), &self.contract)?)
            })
            .cloned()
    }

    /// Materialize the value as `Arc<T>`
    pub fn get_as<T: ?Sized + Send + Sync + 'static>(&self) -> ResolutionResult<Arc<T>> {
        self.get()?.downcast::<T>()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("contract", &self.contract)
            .field("qualifiers", &self.qualifiers)
            .field("candidates", &self.candidates.len())
            .field("selected", &self.selected.get().map(|b| b.bean_type()))
            .finish()
    }
}
