//! livemd
//!
//! HTML Microdata (`itemscope`, `itemtype`, `itemprop`, `itemid`, `itemref`)
//! exposed as a live object model over a [`livemd_dom`] document.
//!
//! Reads are always derived from the tree, writes go straight to it, and
//! batches of mutation records keep the item collection and any template
//! rendered views up to date.
//!
//! # Example
//! ```rust,ignore
//! use livemd::{Config, Microdata};
//!
//! let mut md = Microdata::from_html(html, "https://example.com/", Config::default())?;
//! let person = md.get("p1").unwrap();
//! md.set(person, "name", "Alice")?;
//! for event in md.flush() {
//!     println!("{event:?}");
//! }
//! ```

mod error;

pub mod accessor;
pub mod cache;
pub mod collection;
pub mod config;
pub mod fetch;
pub mod forms;
pub mod item;
pub mod observer;
pub mod runtime;
pub mod schema;
pub mod scope;
pub mod sync;
pub mod template;
pub mod vocab;

pub use accessor::{PropertyAccessor, ValueChannel};
pub use cache::{CacheStats, ResourceCache, ResourceSource, StaticSource};
pub use collection::{Collection, ItemKey, Reindex, TrackedItem};
pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{DocumentCache, RemoteDocument};
pub use forms::{extract_form_data, FormData};
pub use item::{Item, PropertyInput, PropertyValue, Value};
pub use observer::{ChangeEvent, ChangeObserver, ChangePlan};
pub use runtime::Microdata;
pub use schema::{
    validator_for, GenericValidator, Problem, PropertyRule, SchemaDefinition, SchemaKind,
    SchemaRegistry, StrictValidator, Validation, Validator, Violation,
};
pub use scope::ScopeWalker;
pub use sync::{Container, SyncReport, TemplateSynchronizer};
pub use template::{MicrodataTemplate, TemplateRenderer};
pub use vocab::Identity;

pub use livemd_dom as dom;
pub use livemd_html as html;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
