//! Named attributes and the containers that hold them.
//!
//! An [`Attribute`] is a `(name, value)` pair describing something about the
//! work the current thread is doing (a user, a request id, a task). Rule
//! predicates are satisfied by finding an equal attribute in one of the
//! thread's [`AttributeContainer`]s.

use std::collections::BTreeSet;
use std::fmt;

use logrules_config::PredicateValue;

use crate::print::Printer;

/// Value of an attribute. Values of different variants are never equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeValue {
    Int(i64),
    Str(String),
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<&PredicateValue> for AttributeValue {
    fn from(value: &PredicateValue) -> Self {
        match value {
            PredicateValue::Int(v) => AttributeValue::Int(*v),
            PredicateValue::Str(v) => AttributeValue::Str(v.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// A named value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute {
    name: String,
    value: AttributeValue,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} = {} ]", self.name, self.value)
    }
}

/// A collection of attributes that can answer membership queries.
///
/// Implementations must not change what `has_value` reports while they are
/// attached to an [`AttributeContext`](crate::context::AttributeContext),
/// unless the context's cache is cleared afterwards.
pub trait AttributeContainer: fmt::Debug {
    /// Whether this container holds an attribute equal to `attribute`.
    fn has_value(&self, attribute: &Attribute) -> bool;

    /// Debug dump; see [`print`](crate::print) for the formatting contract.
    fn print(&self, out: &mut dyn fmt::Write, level: i32, spaces_per_level: i32) -> fmt::Result;
}

/// The default container: an ordered set of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: BTreeSet<Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.add(Attribute::new(name, value));
        self
    }

    /// Insert an attribute; returns `false` if an equal one was present.
    pub fn add(&mut self, attribute: Attribute) -> bool {
        self.attributes.insert(attribute)
    }

    /// Remove an attribute; returns `false` if it was absent.
    pub fn remove(&mut self, attribute: &Attribute) -> bool {
        self.attributes.remove(attribute)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl AttributeContainer for AttributeSet {
    fn has_value(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    fn print(&self, out: &mut dyn fmt::Write, level: i32, spaces_per_level: i32) -> fmt::Result {
        let mut printer = Printer::new(out, level, spaces_per_level);
        printer.start()?;
        for attribute in &self.attributes {
            printer.item(attribute)?;
        }
        printer.end()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0, -1)
    }
}
