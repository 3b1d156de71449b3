use crate::Result;
use crate::error::PomlError;
use crate::tpl::ast::Node;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// Caller-supplied values for `<field>` nodes, keyed by field name.
pub trait Bindings {
    fn binding(&self, name: &str) -> Option<&str>;
}

impl<K, V, S> Bindings for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn binding(&self, name: &str) -> Option<&str> {
        self.get(name).map(|v| v.as_ref())
    }
}

impl<K, V> Bindings for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn binding(&self, name: &str) -> Option<&str> {
        self.get(name).map(|v| v.as_ref())
    }
}

/// No bindings at all: every field falls back to its default.
impl Bindings for () {
    fn binding(&self, _name: &str) -> Option<&str> {
        None
    }
}

/// The resolved value of a `<field>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Non-empty lines of a `type="list"` field, in order.
    List(Vec<String>),
}

pub struct Context<'a, B: Bindings + ?Sized> {
    bindings: &'a B,
}

impl<'a, B: Bindings + ?Sized> Context<'a, B> {
    pub fn new(bindings: &'a B) -> Self {
        Self { bindings }
    }

    pub fn lookup(&self, name: &str) -> Option<&'a str> {
        self.bindings.binding(name)
    }

    /// Returns the field's `name` attribute, which every field must carry.
    pub fn field_name<'n>(&self, field: &'n Node) -> Result<&'n str> {
        field
            .attr("name")
            .ok_or_else(|| PomlError::MissingAttribute {
                tag: field.tag().to_string(),
                attribute: "name".to_string(),
            })
    }

    /// Computes the value of a field node.
    ///
    /// A binding wins even when it is the empty string; otherwise the
    /// `default` attribute is used, and failing that the empty string.
    pub fn resolve(&self, field: &Node) -> Result<FieldValue> {
        let name = self.field_name(field)?;
        let value = self
            .lookup(name)
            .or_else(|| field.attr("default"))
            .unwrap_or("");

        if field.attr("type") == Some("list") {
            let items = value
                .split('\n')
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            Ok(FieldValue::List(items))
        } else {
            Ok(FieldValue::Text(value.to_string()))
        }
    }
}
