//! Qualifiers and qualifier sets
//!
//! A qualifier is a disambiguating tag attached to a type, a constructor
//! parameter or a factory. Two qualifiers are the same requirement when their
//! tag and their parameters are equal.
//!
//! Every [`QualifierSet`] contains the two universal tags [`Qualifier::any`]
//! and [`Qualifier::default_tag`]. They are inserted by every constructor, so
//! untagged requests always match untagged candidates.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reserved tag present on every candidate and every request
pub const ANY_TAG: &str = "Any";

/// Reserved tag present on every candidate and every request
pub const DEFAULT_TAG: &str = "Default";

/// Tag used by [`Qualifier::named`]
pub const NAMED_TAG: &str = "Named";

/// A single qualifier tag with optional parameters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier {
    tag: Cow<'static, str>,
    params: BTreeMap<String, String>,
}

impl Qualifier {
    /// Create a qualifier without parameters
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            params: BTreeMap::new(),
        }
    }

    /// The universal `Any` tag
    pub fn any() -> Self {
        Self::new(ANY_TAG)
    }

    /// The universal `Default` tag
    pub fn default_tag() -> Self {
        Self::new(DEFAULT_TAG)
    }

    /// A `Named` qualifier carrying `value`
    pub fn named(value: impl Into<String>) -> Self {
        Self::new(NAMED_TAG).with_param("value", value)
    }

    /// Attach a parameter to this qualifier
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Whether this is one of the two tags every set carries
    pub fn is_universal(&self) -> bool {
        self.params.is_empty() && (self.tag == ANY_TAG || self.tag == DEFAULT_TAG)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.tag)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, v))
                .collect();
            write!(f, "({})", params.join(", "))?;
        }
        Ok(())
    }
}

/// An ordered set of qualifiers that always includes the universal tags
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifierSet(BTreeSet<Qualifier>);

impl QualifierSet {
    /// A set holding only the universal tags
    pub fn universal() -> Self {
        Self::with_universal_tags(std::iter::empty())
    }

    /// Build a set from declared tags, adding the universal tags
    pub fn with_universal_tags<I>(declared: I) -> Self
    where
        I: IntoIterator<Item = Qualifier>,
    {
        let mut tags: BTreeSet<Qualifier> = declared.into_iter().collect();
        tags.insert(Qualifier::any());
        tags.insert(Qualifier::default_tag());
        Self(tags)
    }

    /// True iff `candidate` contains every qualifier of `requested`
    pub fn matches(candidate: &QualifierSet, requested: &QualifierSet) -> bool {
        candidate.is_superset_of(requested)
    }

    pub fn is_superset_of(&self, other: &QualifierSet) -> bool {
        self.0.is_superset(&other.0)
    }

    pub fn contains(&self, qualifier: &Qualifier) -> bool {
        self.0.contains(qualifier)
    }

    /// Merge another set into a new one
    pub fn union(&self, other: &QualifierSet) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter()
    }

    /// Qualifiers other than the universal tags
    pub fn declared(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter().filter(|q| !q.is_universal())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true; the universal tags are always present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for QualifierSet {
    fn default() -> Self {
        Self::universal()
    }
}

impl FromIterator<Qualifier> for QualifierSet {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self::with_universal_tags(iter)
    }
}

impl From<Qualifier> for QualifierSet {
    fn from(qualifier: Qualifier) -> Self {
        Self::with_universal_tags([qualifier])
    }
}

impl fmt::Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", tags.join(", "))
    }
}
