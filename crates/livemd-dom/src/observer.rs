//! Mutation Observer
//!
//! Queues mutation records for the observed subtrees. The queue is drained in
//! batches by [`crate::DomTree::take_records`].

use crate::NodeId;

/// Mutation observer attached to a tree
#[derive(Debug, Default)]
pub struct MutationObserver {
    options: MutationObserverInit,
    observed: Vec<NodeId>,
    records: Vec<MutationRecord>,
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Observe everything below the target
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            attribute_filter: None,
        }
    }

    /// Whether a record of this kind is wanted
    pub fn accepts(&self, record: &MutationRecord) -> bool {
        match record.mutation_type {
            MutationType::ChildList => self.child_list,
            MutationType::CharacterData => self.character_data,
            MutationType::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        _ => true,
                    }
            }
        }
    }
}

/// Who caused a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationOrigin {
    /// Anything outside an internal-write section
    #[default]
    External,
    /// Written while [`crate::DomTree::with_internal_writes`] was active
    Internal,
}

/// Mutation record
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
    pub origin: MutationOrigin,
}

impl MutationRecord {
    fn new(mutation_type: MutationType, target: NodeId) -> Self {
        Self {
            mutation_type,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: None,
            origin: MutationOrigin::External,
        }
    }

    /// Child list change on `target`
    pub fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            added_nodes: added,
            removed_nodes: removed,
            ..Self::new(MutationType::ChildList, target)
        }
    }

    /// Attribute change on `target`
    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            old_value,
            ..Self::new(MutationType::Attributes, target)
        }
    }

    /// Character data change on a text node
    pub fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::new(MutationType::CharacterData, target)
        }
    }

    /// Set sibling context
    pub fn with_siblings(mut self, previous: Option<NodeId>, next: Option<NodeId>) -> Self {
        self.previous_sibling = previous;
        self.next_sibling = next;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

impl MutationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        self.options = options;
        if !self.observed.contains(&target) {
            self.observed.push(target);
        }
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
        self.records.clear();
    }

    pub fn is_observing(&self) -> bool {
        !self.observed.is_empty()
    }

    pub fn observed(&self) -> &[NodeId] {
        &self.observed
    }

    pub fn options(&self) -> &MutationObserverInit {
        &self.options
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    pub fn push_record(&mut self, record: MutationRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_observer() {
        let mut observer = MutationObserver::new();
        observer.observe(NodeId(1), MutationObserverInit {
            child_list: true,
            attributes: true,
            ..Default::default()
        });

        assert_eq!(observer.observed().len(), 1);

        observer.disconnect();
        assert!(!observer.is_observing());
    }

    #[test]
    fn test_attribute_filter() {
        let options = MutationObserverInit {
            attributes: true,
            attribute_filter: Some(vec!["itemprop".to_string()]),
            ..Default::default()
        };

        assert!(options.accepts(&MutationRecord::attribute(NodeId(1), "itemprop", None)));
        assert!(!options.accepts(&MutationRecord::attribute(NodeId(1), "class", None)));
        assert!(!options.accepts(&MutationRecord::character_data(NodeId(2), String::new())));
    }

    #[test]
    fn test_take_records_drains() {
        let mut observer = MutationObserver::new();
        observer.push_record(MutationRecord::child_list(NodeId(0), vec![NodeId(1)], vec![]));
        assert_eq!(observer.take_records().len(), 1);
        assert!(observer.take_records().is_empty());
    }
}
