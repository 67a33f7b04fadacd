//! Schemas
//!
//! A schema describes one item type: which properties it expects and which of
//! them are repeated. Schemas are JSON documents:
//!
//! ```json
//! { "type": "https://schema.org/Person",
//!   "kind": "strict",
//!   "properties": { "name": { "required": true }, "skills": { "repeated": true } } }
//! ```
//!
//! Validation never fails with an error; it reports violations as data.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use livemd_dom::DomTree;
use serde::Deserialize;
use serde_json::Value as Json;
use url::Url;

use crate::cache::{ResourceCache, ResourceSource};
use crate::item::Item;
use crate::vocab;
use crate::{Error, Result};

/// Validation strictness
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Only declared constraints are checked; extra properties are fine
    #[default]
    Generic,
    /// Undeclared properties and repeated values of scalar properties are violations
    Strict,
}

/// Constraints on one property
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PropertyRule {
    pub required: bool,
    pub repeated: bool,
}

/// A parsed schema
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaDefinition {
    #[serde(rename = "type")]
    pub type_url: String,
    #[serde(default)]
    pub kind: SchemaKind,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyRule>,
}

impl SchemaDefinition {
    /// Parse a schema document fetched from `url`
    pub fn from_json(url: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::Invalid {
            what: "schema",
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// Last segment of the type URL
    pub fn type_name(&self) -> &str {
        vocab::split_type(&self.type_url).1
    }

    pub fn rule(&self, name: &str) -> Option<&PropertyRule> {
        self.properties.get(name)
    }

    /// Force declared-repeated properties into arrays. Read shapes follow
    /// the element count; this is where the declared cardinality applies.
    pub fn coerce(&self, data: &mut Json) {
        let Some(record) = data.as_object_mut() else {
            return;
        };
        for (name, rule) in &self.properties {
            if !rule.repeated {
                continue;
            }
            if let Some(value) = record.get_mut(name) {
                if !value.is_array() {
                    *value = Json::Array(vec![value.take()]);
                }
            }
        }
    }

    /// Validate with the validator for this schema's kind
    pub fn validate(&self, data: &Json) -> Validation {
        validator_for(self.kind).validate(self, data)
    }
}

/// What went wrong with one property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A required property is absent
    Missing,
    /// Several values for a property declared single
    NotRepeatable,
    /// Property not declared by a strict schema
    Undeclared,
    /// The record's `@type` does not match the schema
    TypeMismatch { expected: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub property: String,
    pub problem: Problem,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            Problem::Missing => write!(f, "`{}` is required", self.property),
            Problem::NotRepeatable => write!(f, "`{}` takes a single value", self.property),
            Problem::Undeclared => write!(f, "`{}` is not declared", self.property),
            Problem::TypeMismatch { expected, found } => {
                write!(f, "expected type {expected}, found {found}")
            }
        }
    }
}

/// Validation outcome
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Validation {
    pub violations: Vec<Violation>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, property: &str, problem: Problem) {
        self.violations.push(Violation {
            property: property.to_string(),
            problem,
        });
    }
}

/// Checks a JSON-LD shaped record against a schema
pub trait Validator {
    fn kind(&self) -> SchemaKind;
    fn validate(&self, schema: &SchemaDefinition, data: &Json) -> Validation;
}

/// Checks type and required properties
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericValidator;

impl Validator for GenericValidator {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Generic
    }

    fn validate(&self, schema: &SchemaDefinition, data: &Json) -> Validation {
        let mut validation = Validation::default();
        let empty = serde_json::Map::new();
        let record = data.as_object().unwrap_or(&empty);

        if let Some(found) = record.get("@type").and_then(Json::as_str) {
            if found != schema.type_name() {
                validation.push(
                    "@type",
                    Problem::TypeMismatch {
                        expected: schema.type_name().to_string(),
                        found: found.to_string(),
                    },
                );
            }
        }
        for (name, rule) in &schema.properties {
            let present = record.get(name).is_some_and(|v| !v.is_null());
            if rule.required && !present {
                validation.push(name, Problem::Missing);
            }
        }
        validation
    }
}

/// Generic checks plus cardinality and closed property sets
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictValidator;

impl Validator for StrictValidator {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Strict
    }

    fn validate(&self, schema: &SchemaDefinition, data: &Json) -> Validation {
        let mut validation = GenericValidator.validate(schema, data);
        let Some(record) = data.as_object() else {
            return validation;
        };

        for (name, value) in record.iter().filter(|(name, _)| !name.starts_with('@')) {
            match schema.rule(name) {
                None => validation.push(name, Problem::Undeclared),
                Some(rule) if !rule.repeated && value.is_array() => {
                    validation.push(name, Problem::NotRepeatable)
                }
                Some(_) => {}
            }
        }
        validation
    }
}

/// Validator for a schema kind
pub fn validator_for(kind: SchemaKind) -> Box<dyn Validator> {
    match kind {
        SchemaKind::Generic => Box::new(GenericValidator),
        SchemaKind::Strict => Box::new(StrictValidator),
    }
}

/// Loads schemas by type URL and validates items against them
#[derive(Debug)]
pub struct SchemaRegistry<S> {
    source: S,
    cache: ResourceCache<SchemaDefinition>,
}

impl<S: ResourceSource> SchemaRegistry<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: ResourceCache::new(),
        }
    }

    /// Schema published at `url`; concurrent loads of one URL share a fetch
    pub async fn load(&self, url: &str) -> Result<Rc<SchemaDefinition>> {
        self.cache
            .get_or_load(url, || async {
                let body = self.source.fetch(url).await?;
                SchemaDefinition::from_json(url, &body)
            })
            .await
    }

    /// Validate an item against the schema of its first type
    pub async fn validate_item(
        &self,
        tree: &DomTree,
        item: Item,
        base: Option<&Url>,
    ) -> Result<Validation> {
        let type_url = item.item_type(tree).ok_or(Error::Untyped(item.root()))?.to_string();
        let mut data = item.to_structured(tree, base);
        let schema = self.load(&type_url).await?;
        schema.coerce(&mut data);
        Ok(schema.validate(&data))
    }

    pub fn cache(&self) -> &ResourceCache<SchemaDefinition> {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StaticSource;
    use serde_json::json;

    const PERSON: &str = r#"{
        "type": "https://schema.org/Person",
        "kind": "strict",
        "properties": {
            "name": { "required": true },
            "skills": { "repeated": true }
        }
    }"#;

    #[test]
    fn test_parse_definition() {
        let schema = SchemaDefinition::from_json("mem://person", PERSON).unwrap();
        assert_eq!(schema.kind, SchemaKind::Strict);
        assert_eq!(schema.type_name(), "Person");
        assert!(schema.rule("name").unwrap().required);
        assert!(schema.rule("skills").unwrap().repeated);

        let err = SchemaDefinition::from_json("mem://bad", "{").unwrap_err();
        assert!(matches!(err, Error::Invalid { what: "schema", .. }));
    }

    #[test]
    fn test_coerce_repeated() {
        let schema = SchemaDefinition::from_json("mem://person", PERSON).unwrap();
        let mut data = json!({"name": "Ann", "skills": "Design"});
        schema.coerce(&mut data);
        assert_eq!(data, json!({"name": "Ann", "skills": ["Design"]}));
    }

    #[test]
    fn test_generic_and_strict() {
        let mut schema = SchemaDefinition::from_json("mem://person", PERSON).unwrap();
        let data = json!({"@type": "Person", "nickname": "A", "name": ["A", "B"]});

        let strict = schema.validate(&data);
        let problems: Vec<&Problem> = strict.violations.iter().map(|v| &v.problem).collect();
        assert!(problems.contains(&&Problem::Undeclared));
        assert!(problems.contains(&&Problem::NotRepeatable));

        schema.kind = SchemaKind::Generic;
        assert!(schema.validate(&data).is_valid());
        assert_eq!(validator_for(SchemaKind::Generic).kind(), SchemaKind::Generic);

        let missing = schema.validate(&json!({"@type": "Organization"}));
        assert_eq!(missing.violations.len(), 2);
        assert_eq!(missing.violations[1].to_string(), "`name` is required");
    }

    #[test]
    fn test_registry_validates_item() {
        let doc = livemd_html::parse(
            r#"<html><body><div id="p" itemscope itemtype="https://schema.org/Person">
                 <span itemprop="name">Ann</span><span itemprop="skills">Design</span>
               </div><div id="bare" itemscope></div></body></html>"#,
        )
        .unwrap();
        let source = StaticSource::new().with("https://schema.org/Person", PERSON);
        let registry = SchemaRegistry::new(source);

        let p = Item::new(&doc.tree, doc.get_element_by_id("p").unwrap()).unwrap();
        let validation = smol::block_on(registry.validate_item(&doc.tree, p, None)).unwrap();
        assert!(validation.is_valid(), "{:?}", validation);

        smol::block_on(registry.validate_item(&doc.tree, p, None)).unwrap();
        assert_eq!(registry.source().fetches(), 1);

        let bare = Item::new(&doc.tree, doc.get_element_by_id("bare").unwrap()).unwrap();
        let err = smol::block_on(registry.validate_item(&doc.tree, bare, None)).unwrap_err();
        assert!(matches!(err, Error::Untyped(_)));
    }

    #[test]
    fn test_load_failure_is_per_url() {
        let registry = SchemaRegistry::new(StaticSource::new());
        let err = smol::block_on(registry.load("https://example.com/missing")).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
