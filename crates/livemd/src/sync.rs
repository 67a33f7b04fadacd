//! Template synchronization
//!
//! A container is an element whose container attribute names a schema (item
//! type URL) and which has a `<template>` child. Each pass renders one view
//! per authoritative item of that type, keyed by the item's `id`, and tags
//! the view with an `itemid` pointing back at the source.

use std::collections::HashMap;

use livemd_dom::{DomTree, NodeId};
use serde_json::Value as Json;
use url::Url;

use crate::item::Item;
use crate::template::{MicrodataTemplate, TemplateRenderer};
use crate::vocab::{self, ITEMID, Identity};
use crate::Result;

/// A registered view container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    element: NodeId,
    schema: String,
    template: NodeId,
    rendered: Vec<(String, NodeId)>,
    // Source projection each view was last rendered from
    snapshots: HashMap<String, Json>,
}

impl Container {
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Type URL whose items this container renders
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn template(&self) -> NodeId {
        self.template
    }

    /// Source id and view element, in render order
    pub fn rendered(&self) -> &[(String, NodeId)] {
        &self.rendered
    }

    pub fn view_for(&self, id: &str) -> Option<NodeId> {
        self.rendered.iter().find(|(k, _)| k == id).map(|(_, view)| *view)
    }
}

/// Counts from one or more passes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub rendered: usize,
    pub updated: usize,
    /// Views left alone because their source did not change
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Keeps view containers in step with their source items
#[derive(Debug)]
pub struct TemplateSynchronizer<R = MicrodataTemplate> {
    attribute: String,
    renderer: R,
    containers: Vec<Container>,
}

impl TemplateSynchronizer<MicrodataTemplate> {
    pub fn new(attribute: &str) -> Self {
        Self::with_renderer(attribute, MicrodataTemplate)
    }
}

impl<R: TemplateRenderer> TemplateSynchronizer<R> {
    pub fn with_renderer(attribute: &str, renderer: R) -> Self {
        Self {
            attribute: attribute.to_string(),
            renderer,
            containers: Vec::new(),
        }
    }

    /// Container marker attribute
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container(&self, element: NodeId) -> Option<&Container> {
        self.containers.iter().find(|c| c.element == element)
    }

    /// Register new containers and drop ones that left the document or
    /// changed schema. Containers without a template stay unregistered.
    /// Returns the newly registered container elements.
    pub fn discover(&mut self, tree: &DomTree) -> Vec<NodeId> {
        let attribute = &self.attribute;
        self.containers.retain(|c| {
            tree.is_connected(c.element)
                && tree.attr(c.element, attribute).map(str::trim) == Some(c.schema.as_str())
        });

        let candidates: Vec<NodeId> = tree
            .descendants(NodeId::ROOT)
            .filter(|&n| tree.attr(n, attribute).is_some_and(|v| !v.trim().is_empty()))
            .collect();

        let mut registered = Vec::new();
        for element in candidates {
            if self.containers.iter().any(|c| c.element == element) {
                continue;
            }
            let template = tree
                .element_children(element)
                .find(|&c| tree.has_tag(c, "template"));
            let Some(template) = template else {
                tracing::trace!("container {} has no template", element);
                continue;
            };
            let schema = tree.attr(element, attribute).unwrap_or_default().trim().to_string();
            tracing::debug!("registered container {} for {}", element, schema);
            self.containers.push(Container {
                element,
                schema,
                template,
                rendered: Vec::new(),
                snapshots: HashMap::new(),
            });
            registered.push(element);
        }
        registered
    }

    /// Run a pass for every container
    pub fn sync_all(&mut self, tree: &mut DomTree, base: Option<&Url>) -> SyncReport {
        self.sync_where(tree, base, |_| true)
    }

    /// Run a pass for containers rendering any of `types`
    pub fn sync_types(
        &mut self,
        tree: &mut DomTree,
        types: &[String],
        base: Option<&Url>,
    ) -> SyncReport {
        self.sync_where(tree, base, |c| types.iter().any(|t| *t == c.schema))
    }

    /// Run a pass for the given container elements
    pub fn sync_containers(
        &mut self,
        tree: &mut DomTree,
        elements: &[NodeId],
        base: Option<&Url>,
    ) -> SyncReport {
        self.sync_where(tree, base, |c| elements.contains(&c.element))
    }

    fn sync_where(
        &mut self,
        tree: &mut DomTree,
        base: Option<&Url>,
        select: impl Fn(&Container) -> bool,
    ) -> SyncReport {
        let Self { attribute, renderer, containers } = self;
        let mut report = SyncReport::default();
        for container in containers.iter_mut().filter(|c| select(c)) {
            pass(renderer, tree, container, attribute, base, &mut report);
        }
        if !report.is_empty() {
            tracing::debug!(
                "template sync: {} rendered, {} updated, {} removed, {} failed",
                report.rendered,
                report.updated,
                report.removed,
                report.failed
            );
        }
        report
    }
}

/// Connected authoritative items of `schema` outside any view container,
/// in document order
pub fn authoritative_sources(
    tree: &DomTree,
    schema: &str,
    container_attribute: &str,
) -> Vec<(String, NodeId)> {
    tree.descendants(NodeId::ROOT)
        .filter(|&n| vocab::is_scope(tree, n) && vocab::has_type(tree, n, schema))
        .filter(|&n| !tree.ancestors(n).any(|a| tree.has_attr(a, container_attribute)))
        .filter_map(|n| match Identity::of(tree, n) {
            Identity::Authoritative(id) => Some((id, n)),
            _ => None,
        })
        .collect()
}

fn pass<R: TemplateRenderer>(
    renderer: &R,
    tree: &mut DomTree,
    container: &mut Container,
    attribute: &str,
    base: Option<&Url>,
    report: &mut SyncReport,
) {
    let sources = authoritative_sources(tree, &container.schema, attribute);
    let mut retired = Vec::new();

    tree.with_internal_writes(|tree| {
        let Container { rendered, snapshots, .. } = &mut *container;
        rendered.retain(|(id, view)| {
            if sources.iter().any(|(source, _)| source == id) {
                return true;
            }
            match tree.remove(*view) {
                Ok(()) => retired.push(*view),
                Err(err) => tracing::warn!("failed to remove view of `{}`: {}", id, err),
            }
            snapshots.remove(id);
            report.removed += 1;
            false
        });

        for (id, source) in &sources {
            let data = Item::from_scope(*source).to_structured(tree, base);
            let current = container
                .view_for(id)
                .filter(|&view| tree.parent(view) == Some(container.element));
            if current.is_some() && container.snapshots.get(id) == Some(&data) {
                report.unchanged += 1;
                continue;
            }

            let outcome = renderer.render(tree, container.template, &data).and_then(|view| {
                place(tree, container, id, view, &data).inspect_err(|_| retired.push(view))
            });
            match outcome {
                Ok(placement) => {
                    container.snapshots.insert(id.clone(), data);
                    match placement {
                        Placement::New => report.rendered += 1,
                        Placement::Replaced(old) => {
                            retired.extend(old);
                            report.updated += 1;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("render of `{}` into {} failed: {}", id, container.element, err);
                    report.failed += 1;
                }
            }
        }
    });

    for view in retired {
        if let Err(err) = tree.release(view) {
            tracing::trace!("view {} not released: {}", view, err);
        }
    }
}

enum Placement {
    New,
    // Carries the replaced view when it was taken out of the container
    Replaced(Option<NodeId>),
}

// Tag the view and put it in the container
fn place(
    tree: &mut DomTree,
    container: &mut Container,
    id: &str,
    view: NodeId,
    data: &Json,
) -> Result<Placement> {
    let back_ref = data
        .get("@id")
        .and_then(Json::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{id}"));
    tree.set_attr(view, ITEMID, &back_ref)?;

    match container.rendered.iter().position(|(k, _)| k == id) {
        Some(index) => {
            let old = container.rendered[index].1;
            let replaced = if tree.parent(old) == Some(container.element) {
                tree.replace_child(container.element, view, old)?;
                Some(old)
            } else {
                tree.append_child(container.element, view)?;
                None
            };
            container.rendered[index].1 = view;
            Ok(Placement::Replaced(replaced))
        }
        None => {
            tree.append_child(container.element, view)?;
            container.rendered.push((id.to_string(), view));
            Ok(Placement::New)
        }
    }
}
