//! Items
//!
//! An [`Item`] is a handle to an `itemscope` element. It holds no property
//! state of its own: every read walks the live tree, so a read that follows a
//! write in the same turn always sees the written value.

use livemd_dom::{DomTree, NodeId};
use serde_json::{Map, Value as Json};
use url::Url;

use crate::accessor::PropertyAccessor;
use crate::scope::ScopeWalker;
use crate::vocab::{self, ID, ITEMID, ITEMPROP, Identity};
use crate::{Error, Result};

/// Tag used for synthesized property elements when nothing can serve as a prototype
pub const DEFAULT_ELEMENT: &str = "span";

/// A microdata item rooted at an `itemscope` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    root: NodeId,
}

/// A single property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Item(Item),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<Item> {
        match self {
            Self::Item(item) => Some(*item),
            Self::Text(_) => None,
        }
    }
}

/// Result of reading a property. The shape follows the live element count:
/// one element gives `One`, several give `Many`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    One(Value),
    Many(Vec<Value>),
}

impl PropertyValue {
    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// All values in order
    pub fn values(&self) -> &[Value] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Text of a scalar text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::One(value) => value.as_text(),
            Self::Many(_) => None,
        }
    }

    /// Item of a scalar nested value
    pub fn as_item(&self) -> Option<Item> {
        match self {
            Self::One(value) => value.as_item(),
            Self::Many(_) => None,
        }
    }

    /// Text of every text value, in order
    pub fn texts(&self) -> Vec<&str> {
        self.values().iter().filter_map(Value::as_text).collect()
    }
}

/// Value passed to [`Item::set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyInput {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for PropertyInput {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for PropertyInput {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for PropertyInput {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for PropertyInput {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for PropertyInput {
    fn from(values: &[&str]) -> Self {
        Self::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PropertyInput {
    fn from(values: [&str; N]) -> Self {
        Self::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

impl Item {
    /// Item for a scope element
    pub fn new(tree: &DomTree, element: NodeId) -> Result<Self> {
        if tree.is_element(element) && vocab::is_scope(tree, element) {
            Ok(Self { root: element })
        } else {
            Err(Error::InvalidItem(element))
        }
    }

    pub(crate) fn from_scope(root: NodeId) -> Self {
        Self { root }
    }

    /// Root element
    pub fn root(self) -> NodeId {
        self.root
    }

    /// First type URL
    pub fn item_type(self, tree: &DomTree) -> Option<&str> {
        self.types(tree).into_iter().next()
    }

    /// All type URLs
    pub fn types(self, tree: &DomTree) -> Vec<&str> {
        vocab::item_types(tree, self.root)
    }

    /// Last segment of the type URL (`@type`)
    pub fn type_name(self, tree: &DomTree) -> Option<&str> {
        self.item_type(tree).map(|t| vocab::split_type(t).1)
    }

    /// Type URL without its last segment (`@context`)
    pub fn context(self, tree: &DomTree) -> Option<&str> {
        self.item_type(tree).and_then(|t| vocab::split_type(t).0)
    }

    pub fn identity(self, tree: &DomTree) -> Identity {
        Identity::of(tree, self.root)
    }

    /// `@id`: the `itemid` if present, else the document base with `#id`
    pub fn structured_id(self, tree: &DomTree, base: Option<&Url>) -> Option<String> {
        let non_empty = |name| tree.attr(self.root, name).map(str::trim).filter(|v| !v.is_empty());
        if let Some(itemid) = non_empty(ITEMID) {
            return Some(itemid.to_string());
        }
        let id = non_empty(ID)?;
        let fragment = format!("#{id}");
        Some(match base {
            Some(base) => base.join(&fragment).map(String::from).unwrap_or(fragment),
            None => fragment,
        })
    }

    /// Whether at least one property element declares `name`
    pub fn has(self, tree: &DomTree, name: &str) -> bool {
        !self.property_elements(tree, name).is_empty()
    }

    /// Property names in order of first occurrence
    pub fn property_names(self, tree: &DomTree) -> Vec<String> {
        ScopeWalker::new(tree).all_property_names(self.root)
    }

    /// Elements currently bound to `name`
    pub fn property_elements(self, tree: &DomTree, name: &str) -> Vec<NodeId> {
        ScopeWalker::new(tree).property_elements_for(self.root, name)
    }

    /// Read a property. Absent when no element declares it.
    pub fn get(self, tree: &DomTree, name: &str) -> Option<PropertyValue> {
        let mut values: Vec<Value> = self
            .property_elements(tree, name)
            .into_iter()
            .map(|el| read_value(tree, el))
            .collect();

        match values.len() {
            0 => None,
            1 => values.pop().map(PropertyValue::One),
            _ => Some(PropertyValue::Many(values)),
        }
    }

    /// Write a property, synthesizing `<span>` elements where needed
    pub fn set(
        self,
        tree: &mut DomTree,
        name: &str,
        value: impl Into<PropertyInput>,
    ) -> Result<()> {
        self.set_with(tree, name, value, DEFAULT_ELEMENT)
    }

    /// Write a property.
    ///
    /// Values are written to the matching elements positionally. Surplus
    /// values get new elements placed after the last match (or appended to the
    /// root); elements beyond the new length are removed. A scalar therefore
    /// collapses the property to one element. New elements copy the tag of the
    /// last match, or use `default_element` when there is none.
    ///
    /// All writes are tagged as internal in the mutation queue.
    pub fn set_with(
        self,
        tree: &mut DomTree,
        name: &str,
        value: impl Into<PropertyInput>,
        default_element: &str,
    ) -> Result<()> {
        let values = match value.into() {
            PropertyInput::One(value) => vec![value],
            PropertyInput::Many(values) => values,
        };
        let elements = self.property_elements(tree, name);
        let kept = elements.len().min(values.len());

        if elements[..kept].iter().any(|&el| vocab::is_scope(tree, el)) {
            return Err(Error::NestedValue { name: name.to_string() });
        }

        let prototype = elements.last().map(|&el| {
            let tag = tree.tag_name(el).unwrap_or(default_element).to_string();
            (tag, PropertyAccessor::channel(tree, el))
        });

        tree.with_internal_writes(|tree| -> Result<()> {
            for (&el, value) in elements.iter().zip(&values) {
                PropertyAccessor::write(tree, el, value)?;
            }
            for &el in &elements[kept..] {
                tree.remove(el)?;
            }

            let mut anchor = elements[..kept].last().copied();
            for value in &values[kept..] {
                let el = match &prototype {
                    Some((tag, channel)) => {
                        let el = tree.create_element(tag);
                        if let Some(attr) = channel.attribute() {
                            tree.set_attr(el, attr, "")?;
                        }
                        el
                    }
                    None => tree.create_element(default_element),
                };
                tree.set_attr(el, ITEMPROP, name)?;
                PropertyAccessor::write(tree, el, value)?;
                self.insert_property(tree, el, anchor)?;
                anchor = Some(el);
            }
            Ok(())
        })
    }

    // Place a new property element after `anchor` when the anchor lies in
    // this item's own subtree, otherwise at the end of the root
    fn insert_property(self, tree: &mut DomTree, el: NodeId, anchor: Option<NodeId>) -> Result<()> {
        let after = anchor
            .filter(|&a| a != self.root && tree.contains(self.root, a))
            .and_then(|a| tree.parent(a).map(|parent| (parent, a)));

        match after {
            Some((parent, a)) => {
                let next = tree.get(a).and_then(|n| n.next_sibling.to_option());
                tree.insert_before(parent, el, next)?;
            }
            None => {
                tree.append_child(self.root, el)?;
            }
        }
        Ok(())
    }

    /// Apply a plain JSON record with `<span>` as the synthesized tag
    pub fn assign(self, tree: &mut DomTree, record: &Map<String, Json>) -> Result<()> {
        self.assign_with(tree, record, DEFAULT_ELEMENT)
    }

    /// Apply a plain JSON record.
    ///
    /// Scalars become scalar writes and arrays sequence writes. Objects are
    /// applied to the first nested item of that name. Keys starting with `@`
    /// and `null` values are skipped.
    pub fn assign_with(
        self,
        tree: &mut DomTree,
        record: &Map<String, Json>,
        default_element: &str,
    ) -> Result<()> {
        for (name, value) in record {
            if name.starts_with('@') {
                continue;
            }
            match value {
                Json::Null => {}
                Json::Array(values) => {
                    let texts: Vec<String> = values.iter().filter_map(scalar_text).collect();
                    self.set_with(tree, name, PropertyInput::Many(texts), default_element)?;
                }
                Json::Object(nested) => {
                    let target = self
                        .property_elements(tree, name)
                        .into_iter()
                        .find(|&el| vocab::is_scope(tree, el));
                    match target {
                        Some(el) => {
                            Self::from_scope(el).assign_with(tree, nested, default_element)?
                        }
                        None => {
                            tracing::debug!("no nested item `{}` on {}; skipped", name, self.root)
                        }
                    }
                }
                scalar => {
                    if let Some(text) = scalar_text(scalar) {
                        self.set_with(tree, name, PropertyInput::One(text), default_element)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// JSON-LD shaped projection with nested items projected recursively
    pub fn to_structured(self, tree: &DomTree, base: Option<&Url>) -> Json {
        let mut visiting = Vec::new();
        self.project(tree, base, &mut visiting)
    }

    fn project(self, tree: &DomTree, base: Option<&Url>, visiting: &mut Vec<NodeId>) -> Json {
        let mut map = Map::new();
        if let Some(type_url) = self.item_type(tree) {
            let (context, name) = vocab::split_type(type_url);
            map.insert("@type".into(), name.into());
            if let Some(context) = context {
                map.insert("@context".into(), context.into());
            }
        }
        if let Some(id) = self.structured_id(tree, base) {
            map.insert("@id".into(), id.into());
        }

        visiting.push(self.root);
        let walker = ScopeWalker::new(tree);
        let elements = walker.property_elements(self.root);
        for name in walker.all_property_names(self.root) {
            let mut values = Vec::new();
            for &el in elements.iter().filter(|&&el| vocab::declares(tree, el, &name)) {
                if !vocab::is_scope(tree, el) {
                    values.push(Json::String(PropertyAccessor::read(tree, el)));
                } else if visiting.contains(&el) {
                    tracing::trace!("itemref cycle through {}; `{}` not expanded", el, name);
                } else {
                    values.push(Self::from_scope(el).project(tree, base, visiting));
                }
            }
            match values.len() {
                0 => {}
                1 => {
                    map.insert(name, values.remove(0));
                }
                _ => {
                    map.insert(name, Json::Array(values));
                }
            }
        }
        visiting.pop();

        Json::Object(map)
    }
}

fn read_value(tree: &DomTree, element: NodeId) -> Value {
    if vocab::is_scope(tree, element) {
        Value::Item(Item::from_scope(element))
    } else {
        Value::Text(PropertyAccessor::read(tree, element))
    }
}

/// Text form of a JSON scalar
pub(crate) fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
