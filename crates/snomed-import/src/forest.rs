//! Import hierarchy assembly.
//!
//! Concepts of one import run arrive in row order, and a row may name a
//! parent that only appears further down the table. The [`ImportForest`]
//! hangs every concept under a synthetic root until its primary parent shows
//! up, then moves it under that parent. Walking the finished forest from the
//! root yields ancestors before descendants, which is the order concepts must
//! be created in.
//!
//! Nodes live in an arena; links are indices into it, so moving a concept
//! rewrites two index lists and never touches the concept itself.

use std::collections::HashMap;

use snomed_import_types::ImportConcept;
use tracing::debug;

use crate::types::{ImportError, ImportResult};

/// Index of a node in the forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug, Clone)]
struct ForestNode {
    concept: ImportConcept,
    /// `None` while the node hangs under the synthetic root.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The hierarchy of concepts in one import run.
///
/// # Examples
///
/// ```
/// use snomed_import::ImportForest;
/// use snomed_import_types::ImportConcept;
///
/// fn concept(id: &str, parent: &str) -> ImportConcept {
///     let mut concept = ImportConcept::new(id, 0);
///     concept.declared_parents.push(parent.to_string());
///     concept
/// }
///
/// let mut forest = ImportForest::new();
/// forest.insert(concept("child", "parent")).unwrap();
/// forest.insert(concept("parent", "404684003")).unwrap();
///
/// let order: Vec<&str> = forest.creation_order().iter().map(|c| c.id.as_str()).collect();
/// assert_eq!(order, ["parent", "child"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImportForest {
    nodes: Vec<ForestNode>,
    index: HashMap<String, NodeId>,
    root_children: Vec<NodeId>,
}

impl ImportForest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a forest with room for `capacity` concepts.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            root_children: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSERTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Inserts a concept and re-parents every waiting concept that names it as
    /// primary parent.
    ///
    /// The concept goes under its primary parent if that parent is already in
    /// the forest, otherwise under the root. The forest is left untouched when
    /// an error is returned.
    ///
    /// # Errors
    /// - [`ImportError::DuplicateId`] if the id is already in the forest.
    /// - [`ImportError::CyclicHierarchy`] if the concept names itself as
    ///   parent, or would adopt one of its own ancestors.
    /// - [`ImportError::InvalidReparent`] if a concept to adopt already has a
    ///   parent other than the root.
    pub fn insert(&mut self, concept: ImportConcept) -> ImportResult<()> {
        if self.index.contains_key(&concept.id) {
            return Err(ImportError::DuplicateId {
                id: concept.id.clone(),
            });
        }

        if concept.primary_parent() == Some(concept.id.as_str()) {
            return Err(ImportError::CyclicHierarchy {
                id: concept.id.clone(),
                via: concept.id.clone(),
            });
        }

        let parent = concept
            .primary_parent()
            .and_then(|p| self.index.get(p).copied());

        let adoptees: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.concept.primary_parent() == Some(concept.id.as_str()))
            .map(|(i, _)| NodeId(i))
            .collect();

        if let Some(parent) = parent {
            if let Some(ancestor) = self
                .ancestors_or_self(parent)
                .find(|ancestor| adoptees.contains(ancestor))
            {
                return Err(ImportError::CyclicHierarchy {
                    id: concept.id.clone(),
                    via: self.node(ancestor).concept.id.clone(),
                });
            }
        }

        for &adoptee in &adoptees {
            self.ensure_detachable(adoptee)?;
        }

        let node_id = NodeId(self.nodes.len());
        self.index.insert(concept.id.clone(), node_id);
        self.nodes.push(ForestNode {
            concept,
            parent: None,
            children: Vec::new(),
        });
        self.attach(node_id, parent);

        for adoptee in adoptees {
            self.detach(adoptee)?;
            self.attach(adoptee, Some(node_id));
            debug!(
                child = %self.node(adoptee).concept.id,
                parent = %self.node(node_id).concept.id,
                "re-parented waiting concept"
            );
        }

        Ok(())
    }

    fn attach(&mut self, child: NodeId, parent: Option<NodeId>) {
        self.nodes[child.0].parent = parent;
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(child),
            None => self.root_children.push(child),
        }
    }

    /// Removes a child of the root from the root's children.
    fn detach(&mut self, child: NodeId) -> ImportResult<()> {
        self.ensure_detachable(child)?;
        self.root_children.retain(|&id| id != child);
        Ok(())
    }

    fn ensure_detachable(&self, child: NodeId) -> ImportResult<()> {
        match self.node(child).parent {
            None => Ok(()),
            Some(parent) => Err(ImportError::InvalidReparent {
                id: self.node(child).concept.id.clone(),
                parent: self.node(parent).concept.id.clone(),
            }),
        }
    }

    fn node(&self, id: NodeId) -> &ForestNode {
        &self.nodes[id.0]
    }

    fn ancestors_or_self(&self, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(start), move |&id| self.node(id).parent)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Returns the number of concepts in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no concept has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if a concept with this id is in the forest.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Gets a concept by id.
    pub fn get(&self, id: &str) -> Option<&ImportConcept> {
        self.index.get(id).map(|&node| &self.node(node).concept)
    }

    /// Gets the concept a concept currently hangs under.
    ///
    /// Returns `None` for unknown ids and for concepts under the root.
    pub fn parent_of(&self, id: &str) -> Option<&ImportConcept> {
        let node = *self.index.get(id)?;
        self.node(node)
            .parent
            .map(|parent| &self.node(parent).concept)
    }

    /// Returns true if the concept hangs under the root, i.e. its primary
    /// parent is not part of this import run.
    pub fn is_root_child(&self, id: &str) -> bool {
        self.index
            .get(id)
            .is_some_and(|&node| self.node(node).parent.is_none())
    }

    /// Gets the children of a concept, in attachment order.
    pub fn children_of(&self, id: &str) -> Vec<&ImportConcept> {
        self.index
            .get(id)
            .map(|&node| self.concepts(&self.node(node).children))
            .unwrap_or_default()
    }

    /// Gets the concepts hanging directly under the root, in attachment order.
    pub fn root_children(&self) -> Vec<&ImportConcept> {
        self.concepts(&self.root_children)
    }

    /// Gets the depth of a concept; children of the root have depth 1.
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let node = *self.index.get(id)?;
        Some(self.ancestors_or_self(node).count())
    }

    fn concepts(&self, nodes: &[NodeId]) -> Vec<&ImportConcept> {
        nodes.iter().map(|&node| &self.node(node).concept).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRAVERSAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Walks the forest depth-first from the root, yielding each concept with
    /// its depth. Parents come before their children; siblings keep
    /// attachment order.
    pub fn walk(&self) -> Vec<(usize, &ImportConcept)> {
        self.walk_nodes()
            .into_iter()
            .map(|(depth, node)| (depth, &self.node(node).concept))
            .collect()
    }

    /// Returns concepts in the order they can be created: every concept after
    /// the concept it hangs under.
    pub fn creation_order(&self) -> Vec<&ImportConcept> {
        self.walk_nodes()
            .into_iter()
            .map(|(_, node)| &self.node(node).concept)
            .collect()
    }

    /// Consumes the forest, returning its concepts in creation order.
    pub fn into_creation_order(self) -> Vec<ImportConcept> {
        let order = self.walk_nodes();
        let mut slots: Vec<Option<ImportConcept>> =
            self.nodes.into_iter().map(|n| Some(n.concept)).collect();

        order
            .into_iter()
            .filter_map(|(_, node)| slots[node.0].take())
            .collect()
    }

    fn walk_nodes(&self) -> Vec<(usize, NodeId)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, NodeId)> =
            self.root_children.iter().rev().map(|&node| (1, node)).collect();

        while let Some((depth, node)) = stack.pop() {
            order.push((depth, node));
            stack.extend(
                self.node(node)
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (depth + 1, child)),
            );
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn concept(id: &str, parents: &[&str]) -> ImportConcept {
        let mut concept = ImportConcept::new(id, 0);
        concept.declared_parents = parents.iter().map(|p| p.to_string()).collect();
        concept
    }

    /// Parent id (or "ROOT") mapped to its set of child ids.
    fn shape(forest: &ImportForest) -> BTreeMap<String, BTreeSet<String>> {
        let mut shape: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (_, concept) in forest.walk() {
            let parent = forest
                .parent_of(&concept.id)
                .map(|p| p.id.clone())
                .unwrap_or_else(|| "ROOT".to_string());
            shape.entry(parent).or_default().insert(concept.id.clone());
        }
        shape
    }

    fn ids(concepts: Vec<&ImportConcept>) -> Vec<&str> {
        concepts.into_iter().map(|c| c.id.as_str()).collect()
    }

    /// A three-level chain plus a sibling, listed parents first.
    fn chain() -> Vec<ImportConcept> {
        vec![
            concept("a", &["404684003"]),
            concept("b", &["a"]),
            concept("c", &["b"]),
            concept("d", &["a", "b"]),
        ]
    }

    #[test]
    fn test_insert_under_known_parent() {
        let mut forest = ImportForest::new();
        for c in chain() {
            forest.insert(c).unwrap();
        }

        assert_eq!(forest.len(), 4);
        assert_eq!(ids(forest.root_children()), ["a"]);
        assert_eq!(ids(forest.children_of("a")), ["b", "d"]);
        assert_eq!(forest.parent_of("c").map(|p| p.id.as_str()), Some("b"));
        assert_eq!(forest.depth_of("c"), Some(3));
        assert_eq!(forest.depth_of("missing"), None);
    }

    #[test]
    fn test_reverse_insertion_gives_same_shape() {
        let mut forward = ImportForest::new();
        for c in chain() {
            forward.insert(c).unwrap();
        }

        let mut reverse = ImportForest::new();
        for c in chain().into_iter().rev() {
            reverse.insert(c).unwrap();
        }

        assert_eq!(shape(&forward), shape(&reverse));
        assert_eq!(ids(reverse.root_children()), ["a"]);
    }

    #[test]
    fn test_unknown_parent_stays_under_root() {
        let mut forest = ImportForest::new();
        forest.insert(concept("x", &["138875005"])).unwrap();
        forest.insert(concept("y", &["x"])).unwrap();

        assert!(forest.is_root_child("x"));
        assert!(!forest.is_root_child("y"));
        assert_eq!(forest.parent_of("x"), None);
        assert_eq!(forest.depth_of("x"), Some(1));
    }

    #[test]
    fn test_concept_without_parent_goes_under_root() {
        let mut forest = ImportForest::new();
        forest.insert(concept("orphan", &[])).unwrap();
        assert_eq!(ids(forest.root_children()), ["orphan"]);
    }

    #[test]
    fn test_root_child_iff_parent_unknown() {
        let mut forest = ImportForest::new();
        let rows = [
            concept("c", &["b"]),
            concept("e", &["404684003"]),
            concept("b", &["a"]),
            concept("a", &["e"]),
            concept("f", &["zzz"]),
        ];
        for c in rows {
            forest.insert(c).unwrap();
        }

        for (_, c) in forest.walk() {
            let parent_known = c.primary_parent().is_some_and(|p| forest.contains(p));
            assert_eq!(forest.is_root_child(&c.id), !parent_known, "{}", c.id);
        }
        assert_eq!(ids(forest.creation_order()), ["e", "a", "b", "c", "f"]);
    }

    #[test]
    fn test_secondary_parent_does_not_drive_placement() {
        let mut forest = ImportForest::new();
        forest.insert(concept("d", &["a", "b"])).unwrap();
        forest.insert(concept("b", &["404684003"])).unwrap();

        assert!(forest.is_root_child("d"));
        assert!(forest.children_of("b").is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut forest = ImportForest::new();
        forest.insert(concept("a", &["404684003"])).unwrap();
        let err = forest.insert(concept("a", &["64572001"])).unwrap_err();

        assert!(matches!(err, ImportError::DuplicateId { ref id } if id == "a"));
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_self_parent_rejected() {
        let mut forest = ImportForest::new();
        let err = forest.insert(concept("a", &["a"])).unwrap_err();
        assert!(matches!(err, ImportError::CyclicHierarchy { .. }));
        assert!(forest.is_empty());
    }

    #[test]
    fn test_cycle_rejected_and_forest_unchanged() {
        let mut forest = ImportForest::new();
        forest.insert(concept("a", &["c"])).unwrap();
        forest.insert(concept("b", &["a"])).unwrap();
        let before = shape(&forest);

        // c's parent b descends from a, and a waits for c.
        let err = forest.insert(concept("c", &["b"])).unwrap_err();
        assert!(matches!(err, ImportError::CyclicHierarchy { ref via, .. } if via == "a"));
        assert_eq!(shape(&forest), before);
        assert!(!forest.contains("c"));
    }

    #[test]
    fn test_walk_depths() {
        let mut forest = ImportForest::new();
        for c in chain() {
            forest.insert(c).unwrap();
        }
        let walked: Vec<(usize, &str)> = forest
            .walk()
            .into_iter()
            .map(|(depth, c)| (depth, c.id.as_str()))
            .collect();
        assert_eq!(walked, [(1, "a"), (2, "b"), (3, "c"), (2, "d")]);
    }

    #[test]
    fn test_into_creation_order() {
        let mut forest = ImportForest::with_capacity(4);
        for c in chain().into_iter().rev() {
            forest.insert(c).unwrap();
        }
        let order: Vec<String> = forest.into_creation_order().into_iter().map(|c| c.id).collect();

        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(position("a") < position("b"));
        assert!(position("b") < position("c"));
        assert!(position("a") < position("d"));
        assert_eq!(order.len(), 4);
    }
}
