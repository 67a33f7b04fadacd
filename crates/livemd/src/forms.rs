//! Form data extraction
//!
//! Collects the name/value pairs a form would submit, in tree order, and
//! folds them into a plain JSON record that [`crate::Item::assign`] accepts.

use livemd_dom::{DomTree, NodeId};
use serde_json::{Map, Value as Json};

/// Input types that never contribute a value
const SKIPPED_INPUTS: &[&str] = &["submit", "reset", "button", "image", "file"];

/// Submitted entries in tree order; a name may repeat
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Every value for `name`
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries.iter().filter(|(n, _)| n == name).map(|(_, v)| v.as_str()).collect()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain record: one string per name, or an array when a name repeats
    pub fn to_record(&self) -> Map<String, Json> {
        let mut record = Map::new();
        for (name, value) in &self.entries {
            match record.get_mut(name) {
                None => {
                    record.insert(name.clone(), Json::String(value.clone()));
                }
                Some(Json::Array(values)) => values.push(Json::String(value.clone())),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Json::Array(vec![first, Json::String(value.clone())]);
                }
            }
        }
        record
    }
}

/// Entries of the named, enabled controls under `form`
pub fn extract_form_data(tree: &DomTree, form: NodeId) -> FormData {
    let mut data = FormData::new();
    for control in tree.descendants(form) {
        let Some(name) = tree.attr(control, "name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if is_disabled(tree, form, control) {
            continue;
        }
        match tree.tag_name(control).unwrap_or_default() {
            "input" => {
                let kind = tree.attr(control, "type").unwrap_or("text").to_ascii_lowercase();
                if SKIPPED_INPUTS.contains(&kind.as_str()) {
                    continue;
                }
                if matches!(kind.as_str(), "checkbox" | "radio") {
                    if tree.has_attr(control, "checked") {
                        data.append(name, tree.attr(control, "value").unwrap_or("on"));
                    }
                    continue;
                }
                data.append(name, tree.attr(control, "value").unwrap_or_default());
            }
            "select" => {
                for value in selected_options(tree, control) {
                    data.append(name, &value);
                }
            }
            "textarea" => data.append(name, &tree.text_content(control)),
            _ => {}
        }
    }
    tracing::trace!("form {} yielded {} entries", form, data.len());
    data
}

// `disabled` on the control or on a fieldset between it and the form
fn is_disabled(tree: &DomTree, form: NodeId, control: NodeId) -> bool {
    tree.has_attr(control, "disabled")
        || tree
            .ancestors(control)
            .take_while(|&a| a != form)
            .any(|a| tree.has_tag(a, "fieldset") && tree.has_attr(a, "disabled"))
}

fn selected_options(tree: &DomTree, select: NodeId) -> Vec<String> {
    let options: Vec<NodeId> = tree
        .descendants(select)
        .filter(|&n| tree.has_tag(n, "option") && !tree.has_attr(n, "disabled"))
        .collect();
    let option_value = |option: NodeId| {
        tree.attr(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| tree.text_content(option).trim().to_string())
    };

    let selected: Vec<String> = options
        .iter()
        .filter(|&&o| tree.has_attr(o, "selected"))
        .map(|&o| option_value(o))
        .collect();
    if selected.is_empty() && !tree.has_attr(select, "multiple") {
        return options.first().map(|&o| option_value(o)).into_iter().collect();
    }
    selected
}
