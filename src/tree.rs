//! The flat document tree: a structure-of-arrays forest addressed entirely
//! by integer node indices, plus the machinery that keeps every node's
//! ancestor Bloom filter in sync as the tree is built.
//!
//! Every per-node field lives in its own parallel `Vec`, indexed by
//! [`NodeId`]. This is deliberate: selector matching reads one or two fields
//! (tag, classes, ancestor filter) across many sibling nodes in a tight
//! loop, and keeping those columns densely packed is what makes that loop
//! cache-friendly. Resist the urge to collapse this into an array of
//! per-node structs — that's exactly the representation this design avoids.

use crate::atom::AtomId;
use crate::bloom::BloomFilter;
use crate::error::{EngineError, Result};

/// An index into a [`FlatTree`]'s node columns. `NodeId(0)` is the reserved
/// synthetic document node and also serves as the "no node" sentinel for
/// parent/sibling links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The document node / "no node" sentinel.
    pub const NONE: NodeId = NodeId(0);

    /// Whether this is the sentinel index.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// The maximum number of classes a single node may carry.
pub const MAX_CLASSES: usize = 255;

/// The kind of content a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The synthetic root at index 0.
    Document,
    /// An element, the only node type selectors can target beyond `:empty`.
    Element,
    /// A text run.
    Text,
    /// A CDATA section.
    Cdata,
    /// A comment.
    Comment,
    /// A doctype declaration.
    Doctype,
    /// A detached subtree root with no single element ancestor.
    Fragment,
}

bitflags::bitflags! {
    /// Per-node boolean flags, packed into one byte per node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The node has a non-null `id`.
        const HAS_ID = 1 << 0;
        /// The node has at least one class.
        const HAS_CLASSES = 1 << 1;
        /// The node carries a `style` attribute.
        const HAS_STYLE = 1 << 2;
        /// The node is inside a shadow tree.
        const IN_SHADOW = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Range {
    offset: u32,
    count: u32,
}

/// One appended attribute: an interned name plus an arbitrary byte value.
#[derive(Debug, Clone, Copy, Default)]
struct AttrEntry {
    name: AtomId,
    value: Range,
}

/// A flat, append-only document tree.
///
/// All public mutation happens during a build phase; once matching starts,
/// callers are expected to treat the tree as read-only (see the crate's
/// concurrency notes) even though nothing here enforces that at the type
/// level.
#[derive(Debug, Clone)]
pub struct FlatTree {
    tags: Vec<AtomId>,
    ids: Vec<AtomId>,
    parents: Vec<NodeId>,
    first_children: Vec<NodeId>,
    last_children: Vec<NodeId>,
    next_siblings: Vec<NodeId>,
    prev_siblings: Vec<NodeId>,
    ancestor_filters: Vec<BloomFilter>,
    node_types: Vec<NodeType>,
    depths: Vec<u16>,
    flags: Vec<NodeFlags>,
    class_ranges: Vec<Range>,
    attr_ranges: Vec<Range>,
    text_ranges: Vec<Range>,

    classes_arena: Vec<AtomId>,
    attrs_arena: Vec<AttrEntry>,
    attr_value_arena: Vec<u8>,
    text_arena: Vec<u8>,

    /// The interned `"style"` atom, used to keep `HAS_STYLE` accurate
    /// without the tree needing a reference back to the atom table.
    style_atom: AtomId,
}

impl FlatTree {
    /// Creates a tree with just its synthetic document node.
    ///
    /// `style_atom` should be the id [`crate::atom::AtomTable::intern`]
    /// returned for `b"style"`; it lets [`FlatTree::add_attribute`] maintain
    /// [`NodeFlags::HAS_STYLE`] without the tree needing to intern strings
    /// itself.
    pub fn new(style_atom: AtomId) -> Self {
        let mut tree = FlatTree {
            tags: Vec::new(),
            ids: Vec::new(),
            parents: Vec::new(),
            first_children: Vec::new(),
            last_children: Vec::new(),
            next_siblings: Vec::new(),
            prev_siblings: Vec::new(),
            ancestor_filters: Vec::new(),
            node_types: Vec::new(),
            depths: Vec::new(),
            flags: Vec::new(),
            class_ranges: Vec::new(),
            attr_ranges: Vec::new(),
            text_ranges: Vec::new(),
            classes_arena: Vec::new(),
            attrs_arena: Vec::new(),
            attr_value_arena: Vec::new(),
            text_arena: Vec::new(),
            style_atom,
        };
        tree.push_raw(
            NodeType::Document,
            AtomId::NULL,
            NodeId::NONE,
            0,
            BloomFilter::empty(),
        );
        tree
    }

    fn push_raw(
        &mut self,
        node_type: NodeType,
        tag: AtomId,
        parent: NodeId,
        depth: u16,
        ancestor_filter: BloomFilter,
    ) -> NodeId {
        let id = NodeId(self.tags.len() as u32);
        self.tags.push(tag);
        self.ids.push(AtomId::NULL);
        self.parents.push(parent);
        self.first_children.push(NodeId::NONE);
        self.last_children.push(NodeId::NONE);
        self.next_siblings.push(NodeId::NONE);
        self.prev_siblings.push(NodeId::NONE);
        self.ancestor_filters.push(ancestor_filter);
        self.node_types.push(node_type);
        self.depths.push(depth);
        self.flags.push(NodeFlags::default());
        self.class_ranges.push(Range::default());
        self.attr_ranges.push(Range::default());
        self.text_ranges.push(Range::default());
        id
    }

    fn check_parent(&self, parent: NodeId) -> Result<()> {
        if parent.0 as usize >= self.tags.len() {
            return Err(EngineError::IndexOutOfRange {
                what: "node",
                index: parent.0,
                len: self.tags.len() as u32,
            });
        }
        Ok(())
    }

    /// The hashes this node itself contributes to a *child's* ancestor
    /// filter: its tag, its id (if set), and each of its classes.
    fn own_hashes(&self, node: NodeId, tree_hash_of: impl Fn(AtomId) -> u32) -> BloomFilter {
        let mut filter = BloomFilter::empty();
        let idx = node.0 as usize;
        filter.add(tree_hash_of(self.tags[idx]));
        if self.flags[idx].contains(NodeFlags::HAS_ID) {
            filter.add(tree_hash_of(self.ids[idx]));
        }
        for &class in self.classes_slice(node) {
            filter.add(tree_hash_of(class));
        }
        filter
    }

    /// Appends a new element node as the last child of `parent`.
    ///
    /// `hash_of` must return the same value [`crate::atom::AtomTable::hash_of`]
    /// would for the ids involved — the tree has no atom table of its own,
    /// so the caller (normally [`crate::Session`]) supplies it.
    pub fn create_element(
        &mut self,
        tag: AtomId,
        parent: NodeId,
        hash_of: impl Fn(AtomId) -> u32,
    ) -> Result<NodeId> {
        self.check_parent(parent)?;

        if parent.is_none() {
            let id = self.push_raw(NodeType::Element, tag, NodeId::NONE, 0, BloomFilter::empty());
            return Ok(id);
        }

        let depth = self.depths[parent.0 as usize] + 1;
        let mut ancestor_filter = self.ancestor_filters[parent.0 as usize];
        ancestor_filter.union_with(self.own_hashes(parent, &hash_of));

        let id = self.push_raw(NodeType::Element, tag, parent, depth, ancestor_filter);
        self.link_as_last_child(parent, id);
        Ok(id)
    }

    /// Appends a new text node as the last child of `parent`.
    ///
    /// Per the data model, text nodes always get an empty ancestor filter:
    /// they are never selector targets beyond `:empty` consideration, so
    /// there's no benefit to tracking their ancestry for Bloom purposes.
    pub fn create_text(&mut self, parent: NodeId, bytes: &[u8]) -> Result<NodeId> {
        self.check_parent(parent)?;

        let depth = if parent.is_none() {
            0
        } else {
            self.depths[parent.0 as usize] + 1
        };

        let id = self.push_raw(NodeType::Text, AtomId::NULL, parent, depth, BloomFilter::empty());

        let offset = u32::try_from(self.text_arena.len()).map_err(|_| EngineError::SizeOverflow {
            context: "growing the text arena",
        })?;
        self.text_arena.extend_from_slice(bytes);
        self.text_ranges[id.0 as usize] = Range {
            offset,
            count: bytes.len() as u32,
        };

        if !parent.is_none() {
            self.link_as_last_child(parent, id);
        }
        Ok(id)
    }

    fn link_as_last_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.last_children[parent.0 as usize];
        if prev_last.is_none() {
            self.first_children[parent.0 as usize] = child;
        } else {
            self.next_siblings[prev_last.0 as usize] = child;
            self.prev_siblings[child.0 as usize] = prev_last;
        }
        self.last_children[parent.0 as usize] = child;
    }

    /// Sets `node`'s id.
    ///
    /// Per the documented limitation, this does not retroactively update
    /// the ancestor filters of any descendants `node` already has — set the
    /// id immediately after [`FlatTree::create_element`], before creating
    /// children, if descendant selectors need to see it.
    pub fn set_id(&mut self, node: NodeId, atom: AtomId) -> Result<()> {
        self.check_parent(node)?;
        let idx = node.0 as usize;
        self.ids[idx] = atom;
        self.flags[idx].set(NodeFlags::HAS_ID, !atom.is_null());
        Ok(())
    }

    /// Sets `node`'s class list (up to [`MAX_CLASSES`] entries).
    ///
    /// Same retroactivity caveat as [`FlatTree::set_id`].
    pub fn set_classes(&mut self, node: NodeId, classes: &[AtomId]) -> Result<()> {
        self.check_parent(node)?;
        if classes.len() > MAX_CLASSES {
            return Err(EngineError::TooManyClasses { count: classes.len() });
        }

        let offset = u32::try_from(self.classes_arena.len()).map_err(|_| EngineError::SizeOverflow {
            context: "growing the classes arena",
        })?;
        self.classes_arena.extend_from_slice(classes);

        let idx = node.0 as usize;
        self.class_ranges[idx] = Range {
            offset,
            count: classes.len() as u32,
        };
        self.flags[idx].set(NodeFlags::HAS_CLASSES, !classes.is_empty());
        Ok(())
    }

    /// Appends an attribute to `node`'s attribute list.
    pub fn add_attribute(&mut self, node: NodeId, name: AtomId, value: &[u8]) -> Result<()> {
        self.check_parent(node)?;

        let value_offset = u32::try_from(self.attr_value_arena.len()).map_err(|_| {
            EngineError::SizeOverflow {
                context: "growing the attribute value arena",
            }
        })?;
        self.attr_value_arena.extend_from_slice(value);

        let idx = node.0 as usize;
        let attr_offset = if self.attr_ranges[idx].count == 0 {
            u32::try_from(self.attrs_arena.len()).map_err(|_| EngineError::SizeOverflow {
                context: "growing the attribute arena",
            })?
        } else {
            self.attr_ranges[idx].offset
        };

        self.attrs_arena.push(AttrEntry {
            name,
            value: Range {
                offset: value_offset,
                count: value.len() as u32,
            },
        });
        self.attr_ranges[idx] = Range {
            offset: attr_offset,
            count: self.attr_ranges[idx].count + 1,
        };

        if name == self.style_atom {
            self.flags[idx].insert(NodeFlags::HAS_STYLE);
        }
        Ok(())
    }

    // -- read-only accessors -------------------------------------------------

    /// Total number of nodes, including the synthetic document node.
    pub fn node_count(&self) -> usize {
        self.tags.len()
    }

    /// The node's tag atom, or [`AtomId::NULL`] for non-element nodes.
    pub fn tag(&self, node: NodeId) -> AtomId {
        self.tags[node.0 as usize]
    }

    /// The node's id atom, or [`AtomId::NULL`] if absent.
    pub fn id(&self, node: NodeId) -> AtomId {
        self.ids[node.0 as usize]
    }

    /// The node's parent, or [`NodeId::NONE`] if it is a root or unattached.
    pub fn parent(&self, node: NodeId) -> NodeId {
        self.parents[node.0 as usize]
    }

    /// The node's first child, or [`NodeId::NONE`].
    pub fn first_child(&self, node: NodeId) -> NodeId {
        self.first_children[node.0 as usize]
    }

    /// The node's next sibling, or [`NodeId::NONE`].
    pub fn next_sibling(&self, node: NodeId) -> NodeId {
        self.next_siblings[node.0 as usize]
    }

    /// The node's previous sibling, or [`NodeId::NONE`].
    pub fn prev_sibling(&self, node: NodeId) -> NodeId {
        self.prev_siblings[node.0 as usize]
    }

    /// The node's ancestor Bloom filter.
    pub fn ancestor_filter(&self, node: NodeId) -> BloomFilter {
        self.ancestor_filters[node.0 as usize]
    }

    /// The node's depth (0 at the document node and at any root element).
    pub fn depth(&self, node: NodeId) -> u16 {
        self.depths[node.0 as usize]
    }

    /// Whether `node` is an element.
    pub fn is_element(&self, node: NodeId) -> bool {
        self.node_types[node.0 as usize] == NodeType::Element
    }

    /// The node's type.
    pub fn node_type(&self, node: NodeId) -> NodeType {
        self.node_types[node.0 as usize]
    }

    fn classes_slice(&self, node: NodeId) -> &[AtomId] {
        let range = self.class_ranges[node.0 as usize];
        let start = range.offset as usize;
        let end = start + range.count as usize;
        &self.classes_arena[start..end]
    }

    /// The node's classes, in insertion order.
    pub fn classes(&self, node: NodeId) -> &[AtomId] {
        self.classes_slice(node)
    }

    /// Whether `node` carries `class` among its classes.
    pub fn has_class(&self, node: NodeId, class: AtomId) -> bool {
        self.classes_slice(node).contains(&class)
    }

    /// The node's text payload, for text-like node types.
    pub fn text_of(&self, node: NodeId) -> Option<&[u8]> {
        match self.node_types[node.0 as usize] {
            NodeType::Text | NodeType::Cdata | NodeType::Comment => {
                let range = self.text_ranges[node.0 as usize];
                let start = range.offset as usize;
                let end = start + range.count as usize;
                Some(&self.text_arena[start..end])
            }
            _ => None,
        }
    }

    /// The node's attribute value by name, if present.
    pub fn attribute(&self, node: NodeId, name: AtomId) -> Option<&[u8]> {
        let range = self.attr_ranges[node.0 as usize];
        let start = range.offset as usize;
        let end = start + range.count as usize;
        self.attrs_arena[start..end].iter().find_map(|entry| {
            if entry.name == name {
                let vs = entry.value.offset as usize;
                let ve = vs + entry.value.count as usize;
                Some(&self.attr_value_arena[vs..ve])
            } else {
                None
            }
        })
    }

    /// Whether `node` has no first child (for text nodes, also treats an
    /// empty text payload as empty, matching CSS `:empty` semantics).
    pub fn is_empty_node(&self, node: NodeId) -> bool {
        if !self.first_children[node.0 as usize].is_none() {
            return false;
        }
        match self.node_types[node.0 as usize] {
            NodeType::Text => self.text_of(node).map(|t| t.is_empty()).unwrap_or(true),
            _ => true,
        }
    }

    /// The node's flags.
    pub fn flags(&self, node: NodeId) -> NodeFlags {
        self.flags[node.0 as usize]
    }

    /// A lazy, forward iterator over `node`'s children.
    pub fn children(&self, node: NodeId) -> Children<'_> {
        Children {
            tree: self,
            current: self.first_children[node.0 as usize],
        }
    }

    /// A lazy, bottom-up iterator over `node`'s strict ancestors, starting
    /// at its parent.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self.parents[node.0 as usize],
        }
    }

    /// The 1-based index of `node` among its element siblings, counting
    /// only element nodes, as used by `:nth-child`.
    pub fn element_index(&self, node: NodeId) -> usize {
        let parent = self.parents[node.0 as usize];
        if parent.is_none() {
            // Root elements aren't linked into any sibling chain; they're
            // always alone at index 1.
            return 1;
        }
        let mut index = 0;
        let mut sib = self.first_children[parent.0 as usize];
        while !sib.is_none() {
            if self.is_element(sib) {
                index += 1;
            }
            if sib == node {
                return index;
            }
            sib = self.next_siblings[sib.0 as usize];
        }
        1
    }

    /// The 1-based index of `node` counting backward from the last element
    /// sibling, as used by `:nth-last-child`.
    pub fn element_index_from_end(&self, node: NodeId) -> usize {
        let mut index = 0;
        let mut cursor = self.parents[node.0 as usize];
        if cursor.is_none() {
            return 1;
        }
        let mut sib = self.last_children[cursor.0 as usize];
        while !sib.is_none() {
            if self.is_element(sib) {
                index += 1;
            }
            if sib == node {
                return index;
            }
            sib = self.prev_siblings[sib.0 as usize];
        }
        1
    }

    /// The nearest previous sibling that is an element, skipping text and
    /// other non-element nodes, as used by the adjacent-sibling combinator.
    pub fn prev_element_sibling(&self, node: NodeId) -> NodeId {
        let mut cursor = self.prev_siblings[node.0 as usize];
        while !cursor.is_none() && !self.is_element(cursor) {
            cursor = self.prev_siblings[cursor.0 as usize];
        }
        cursor
    }
}

/// A lazy, non-restartable forward iterator over a node's children.
pub struct Children<'a> {
    tree: &'a FlatTree,
    current: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current.is_none() {
            return None;
        }
        let item = self.current;
        self.current = self.tree.next_sibling(item);
        Some(item)
    }
}

/// A lazy, non-restartable bottom-up iterator over a node's ancestors.
pub struct Ancestors<'a> {
    tree: &'a FlatTree,
    current: NodeId,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current.is_none() {
            return None;
        }
        let item = self.current;
        self.current = self.tree.parent(item);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{fnv1a, AtomTable};

    fn test_tree() -> (AtomTable, FlatTree) {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        (atoms, FlatTree::new(style))
    }

    #[test]
    fn document_node_is_index_zero() {
        let (_, tree) = test_tree();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.node_type(NodeId::NONE), NodeType::Document);
        assert!(tree.parent(NodeId::NONE).is_none());
    }

    #[test]
    fn sibling_links_are_symmetric() {
        let (atoms, mut tree) = test_tree();
        let div = atoms_tag(&mut tree, &atoms, "div", NodeId::NONE);
        let a = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let b = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let c = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();

        assert_eq!(tree.first_child(div), a);
        assert_eq!(tree.next_sibling(a), b);
        assert_eq!(tree.prev_sibling(b), a);
        assert_eq!(tree.next_sibling(b), c);
        assert_eq!(tree.prev_sibling(c), b);
        assert!(tree.prev_sibling(a).is_none());
        assert!(tree.next_sibling(c).is_none());
    }

    fn atoms_tag(tree: &mut FlatTree, atoms: &AtomTable, _tag: &str, parent: NodeId) -> NodeId {
        tree.create_element(AtomId::NULL, parent, |id| atoms.hash_of(id)).unwrap()
    }

    #[test]
    fn depth_is_parent_depth_plus_one() {
        let (atoms, mut tree) = test_tree();
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let inner = tree.create_element(AtomId::NULL, span, |id| atoms.hash_of(id)).unwrap();

        assert_eq!(tree.depth(div), 0);
        assert_eq!(tree.depth(span), tree.depth(div) + 1);
        assert_eq!(tree.depth(inner), tree.depth(span) + 1);
    }

    #[test]
    fn ancestor_filter_contains_every_strict_ancestor_hash() {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        let mut tree = FlatTree::new(style);

        let container_class = atoms.intern(b"container").unwrap();
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        tree.set_classes(div, &[container_class]).unwrap();

        let span = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();

        let filter = tree.ancestor_filter(span);
        assert!(filter.might_contain(fnv1a(b"container")));
        // Almost-certainly-false negative control: a hash we never inserted.
        assert!(!filter.might_contain(fnv1a(b"never-used-class-xyz")));
    }

    #[test]
    fn set_id_after_children_does_not_retroactively_update_descendants() {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        let mut tree = FlatTree::new(style);

        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();

        let late_id = atoms.intern(b"late").unwrap();
        tree.set_id(div, late_id).unwrap();

        let filter = tree.ancestor_filter(span);
        assert!(!filter.might_contain(atoms.hash_of(late_id)));
    }

    #[test]
    fn too_many_classes_is_rejected() {
        let (atoms, mut tree) = test_tree();
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let classes = vec![AtomId(1); MAX_CLASSES + 1];
        let err = tree.set_classes(div, &classes).unwrap_err();
        assert_eq!(err, EngineError::TooManyClasses { count: MAX_CLASSES + 1 });
    }

    #[test]
    fn children_iterator_is_lazy_and_forward_ordered() {
        let (atoms, mut tree) = test_tree();
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let a = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let b = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();

        let collected: Vec<_> = tree.children(div).collect();
        assert_eq!(collected, vec![a, b]);
    }

    #[test]
    fn ancestors_iterator_excludes_self_and_stops_at_root() {
        let (atoms, mut tree) = test_tree();
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let inner = tree.create_element(AtomId::NULL, span, |id| atoms.hash_of(id)).unwrap();

        let collected: Vec<_> = tree.ancestors(inner).collect();
        assert_eq!(collected, vec![span, div]);
    }

    #[test]
    fn has_style_flag_tracks_style_attribute() {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        let mut tree = FlatTree::new(style);
        let div = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();

        assert!(!tree.flags(div).contains(NodeFlags::HAS_STYLE));
        tree.add_attribute(div, style, b"color: red").unwrap();
        assert!(tree.flags(div).contains(NodeFlags::HAS_STYLE));
    }

    #[test]
    fn nth_child_index_counts_only_elements() {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        let mut tree = FlatTree::new(style);
        let ul = tree.create_element(AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let li1 = tree.create_element(AtomId::NULL, ul, |id| atoms.hash_of(id)).unwrap();
        tree.create_text(ul, b"   ").unwrap();
        let li2 = tree.create_element(AtomId::NULL, ul, |id| atoms.hash_of(id)).unwrap();

        assert_eq!(tree.element_index(li1), 1);
        assert_eq!(tree.element_index(li2), 2);
    }
}
