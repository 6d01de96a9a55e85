//! Typed node identities and the id-keyed node pools of the cut mesh.
//!
//! A node is identified by its [`NodeCategory`] together with an integer id.
//! The categories keep separate id spaces, so permanent node `3` and embedded
//! node `3` are different nodes. Permanent, temporary and embedded nodes live
//! in a [`NodePool`] owned by the engine. Local-index nodes are never pooled:
//! they are positions in a single element's node list, used by saved copies of
//! cut elements.
//!
//! Every pooled node records the [`Generation`] in which it was created, and
//! [`NodeHandle`]/[`ElementHandle`] carry that generation so that references
//! kept across a `reset` are detected instead of silently aliasing new data.

use crate::mesh_error::CutMeshError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node categories of the phantom-node method.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeCategory {
    /// Node of the host mesh; survives topology rebuilds.
    Permanent,
    /// Duplicate created while materializing child elements; resolved to a
    /// permanent node before the update finishes.
    Temp,
    /// Intersection point of a cut with an edge or with the element interior.
    Embedded,
    /// Position in an element's node list, used by element-local copies.
    LocalIndex,
}

impl NodeCategory {
    fn prefix(self) -> &'static str {
        match self {
            NodeCategory::Permanent => "",
            NodeCategory::Temp => "t",
            NodeCategory::Embedded => "e",
            NodeCategory::LocalIndex => "l",
        }
    }
}

/// Identity of a node: category plus id within that category.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    category: NodeCategory,
    id: u32,
}

impl NodeKey {
    #[inline]
    pub const fn new(category: NodeCategory, id: u32) -> Self {
        Self { category, id }
    }

    #[inline]
    pub const fn permanent(id: u32) -> Self {
        Self::new(NodeCategory::Permanent, id)
    }

    #[inline]
    pub const fn temp(id: u32) -> Self {
        Self::new(NodeCategory::Temp, id)
    }

    #[inline]
    pub const fn embedded(id: u32) -> Self {
        Self::new(NodeCategory::Embedded, id)
    }

    #[inline]
    pub const fn local(index: u32) -> Self {
        Self::new(NodeCategory::LocalIndex, index)
    }

    #[inline]
    pub const fn category(self) -> NodeCategory {
        self.category
    }

    #[inline]
    pub const fn id(self) -> u32 {
        self.id
    }

    #[inline]
    pub fn is_permanent(self) -> bool {
        self.category == NodeCategory::Permanent
    }

    #[inline]
    pub fn is_temp(self) -> bool {
        self.category == NodeCategory::Temp
    }

    #[inline]
    pub fn is_embedded(self) -> bool {
        self.category == NodeCategory::Embedded
    }

    #[inline]
    pub fn is_local(self) -> bool {
        self.category == NodeCategory::LocalIndex
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeKey")
            .field(&format_args!("{self}"))
            .finish()
    }
}

/// Prints `3` for permanent nodes and `t3`, `e3`, `l3` for the other categories.
impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.category.prefix(), self.id)
    }
}

/// Rebuild counter of the engine. Advanced by `reset` and `clear_ancestry`.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl Generation {
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) const fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// A pooled node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    key: NodeKey,
    parent: Option<NodeKey>,
    generation: Generation,
}

impl Node {
    pub(crate) fn new(key: NodeKey, parent: Option<NodeKey>, generation: Generation) -> Self {
        Self {
            key,
            parent,
            generation,
        }
    }

    #[inline]
    pub fn key(&self) -> NodeKey {
        self.key
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.key.id
    }

    #[inline]
    pub fn category(&self) -> NodeCategory {
        self.key.category
    }

    /// Node this one was duplicated from, if any.
    #[inline]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn remove_parent(&mut self) {
        self.parent = None;
    }
}

/// Reference to a pooled node, valid for the generation it was issued in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) key: NodeKey,
    pub(crate) generation: Generation,
}

impl NodeHandle {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Reference to an element, valid for the generation it was issued in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub(crate) id: u32,
    pub(crate) generation: Generation,
}

impl ElementHandle {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

// -----------------------------------------------------------------------------
// Pools
// -----------------------------------------------------------------------------

/// Id-keyed storage for the nodes of one category.
#[derive(Clone, Debug)]
pub struct NodePool {
    category: NodeCategory,
    nodes: BTreeMap<u32, Node>,
}

impl NodePool {
    pub fn new(category: NodeCategory) -> Self {
        Self {
            category,
            nodes: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    /// Next free id: one past the largest id in use, or 0 when empty.
    pub fn next_id(&self) -> u32 {
        self.nodes.keys().next_back().map_or(0, |last| last + 1)
    }

    /// Create a node with the next free id.
    pub fn create(&mut self, parent: Option<NodeKey>, generation: Generation) -> NodeKey {
        let key = NodeKey::new(self.category, self.next_id());
        self.nodes.insert(key.id, Node::new(key, parent, generation));
        key
    }

    /// Return the node with `id`, creating it when absent.
    pub fn get_or_create(&mut self, id: u32, generation: Generation) -> NodeKey {
        let key = NodeKey::new(self.category, id);
        self.nodes
            .entry(id)
            .or_insert_with(|| Node::new(key, None, generation));
        key
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        if key.category != self.category {
            return None;
        }
        self.nodes.get(&key.id)
    }

    pub fn try_get(&self, key: NodeKey) -> Result<&Node, CutMeshError> {
        self.get(key).ok_or(CutMeshError::UnknownNode(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<Node> {
        if key.category != self.category {
            return None;
        }
        self.nodes.remove(&key.id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::assert_eq_size;

    // Keys are stored by value in every edge; keep them word sized.
    assert_eq_size!(NodeKey, u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_have_separate_id_spaces() {
        assert_ne!(NodeKey::permanent(3), NodeKey::embedded(3));
        assert_eq!(NodeKey::permanent(3).to_string(), "3");
        assert_eq!(NodeKey::embedded(3).to_string(), "e3");
        assert_eq!(NodeKey::temp(1).to_string(), "t1");
        assert_eq!(NodeKey::local(2).to_string(), "l2");
        assert_eq!(format!("{:?}", NodeKey::temp(1)), "NodeKey(t1)");
    }

    #[test]
    fn pool_ids_grow_from_max() {
        let mut pool = NodePool::new(NodeCategory::Embedded);
        assert_eq!(pool.next_id(), 0);
        let a = pool.create(None, Generation::default());
        assert_eq!(a, NodeKey::embedded(0));
        pool.get_or_create(7, Generation::default());
        let b = pool.create(None, Generation::default());
        assert_eq!(b.id(), 8);
        assert!(pool.remove(a).is_some());
        assert_eq!(pool.next_id(), 9);
    }

    #[test]
    fn pool_rejects_foreign_categories() {
        let mut pool = NodePool::new(NodeCategory::Permanent);
        pool.get_or_create(0, Generation::default());
        assert!(pool.get(NodeKey::temp(0)).is_none());
        assert!(matches!(
            pool.try_get(NodeKey::embedded(0)),
            Err(CutMeshError::UnknownNode(_))
        ));
    }

    #[test]
    fn generations_advance() {
        let g = Generation::default();
        assert_eq!(g.next().get(), 1);
        assert!(g < g.next());
    }
}
