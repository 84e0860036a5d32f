//! A data-oriented CSS selector matching engine.
//!
//! Three ideas, in dependency order: strings are collapsed to small integer
//! [`atom`] ids; the document is a [`tree::FlatTree`] of parallel arrays
//! addressed by those ids and by integer node indices, with a per-node
//! ancestor Bloom filter maintained as it's built; selectors are compiled
//! (see [`selector`]) to a compact bytecode executed right-to-left by a
//! small [`selector::vm`].
//!
//! [`Session`] ties these together for one matching run: one atom table,
//! one tree, and the compiled selectors being resolved against it.

pub mod atom;
pub mod bloom;
pub mod error;
pub mod ffi;
pub mod selector;
pub mod tree;

use atom::{AtomId, AtomTable};
use error::Result;
use selector::{CompiledSelector, Specificity};
use tree::{FlatTree, NodeId};

/// A single matching run: the atom table, the document tree being built
/// against it, and the selectors compiled so far.
///
/// Building (interning, tree construction, selector compilation) and
/// matching (`resolve`/`matches`) can be interleaved freely — there is no
/// internal phase transition — but see the crate's concurrency notes: a
/// `Session` itself has no synchronization and is not meant to be shared
/// across threads. An embedder that wants to match in parallel should run
/// one independent `Session` per worker, as the CLI (`bin/flatsel.rs`) does.
pub struct Session {
    atoms: AtomTable,
    tree: FlatTree,
    selectors: Vec<CompiledSelector>,
    style_atom: AtomId,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session: an empty atom table, a tree with just its
    /// synthetic document node, and no compiled selectors.
    pub fn new() -> Self {
        let mut atoms = AtomTable::new();
        // Interned up front so `add_attribute` can track `has_style`
        // without the tree needing its own reference to the atom table.
        let style_atom = atoms.intern(b"style").expect("\"style\" is well under the atom length limit");
        let tree = FlatTree::new(style_atom);
        Session { atoms, tree, selectors: Vec::new(), style_atom }
    }

    /// Discards the tree and compiled selectors, keeping the atom table.
    /// Mirrors the embedding ABI's `engine_create_dom`, which resets a
    /// session for a new document without losing interned strings.
    pub fn reset_tree(&mut self) {
        self.tree = FlatTree::new(self.style_atom);
        self.selectors.clear();
    }

    /// The session's atom table.
    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    /// The session's document tree.
    pub fn tree(&self) -> &FlatTree {
        &self.tree
    }

    /// Interns a byte string, returning its stable id.
    pub fn intern(&mut self, bytes: &[u8]) -> Result<AtomId> {
        self.atoms.intern(bytes)
    }

    /// Appends a new element node.
    pub fn create_element(&mut self, tag: AtomId, parent: NodeId) -> Result<NodeId> {
        let atoms = &self.atoms;
        self.tree.create_element(tag, parent, |id| atoms.hash_of(id))
    }

    /// Appends a new text node.
    pub fn create_text(&mut self, parent: NodeId, bytes: &[u8]) -> Result<NodeId> {
        self.tree.create_text(parent, bytes)
    }

    /// Sets a node's id.
    pub fn set_id(&mut self, node: NodeId, atom: AtomId) -> Result<()> {
        self.tree.set_id(node, atom)
    }

    /// Sets a node's classes.
    pub fn set_classes(&mut self, node: NodeId, classes: &[AtomId]) -> Result<()> {
        self.tree.set_classes(node, classes)
    }

    /// Appends an attribute to a node.
    pub fn add_attribute(&mut self, node: NodeId, name: AtomId, value: &[u8]) -> Result<()> {
        self.tree.add_attribute(node, name, value)
    }

    /// Compiles a comma-separated selector list, appending the resulting
    /// branches to this session's selector list and returning their
    /// indices (in source order).
    pub fn compile_selector_list(&mut self, source: &str) -> Result<Vec<usize>> {
        let compiled = selector::compile_selector_list(source, &mut self.atoms)?;
        let start = self.selectors.len();
        self.selectors.extend(compiled);
        Ok((start..self.selectors.len()).collect())
    }

    /// Compiles a single selector (no top-level commas), appending it to
    /// this session's selector list and returning its index.
    pub fn compile_selector(&mut self, source: &str) -> Result<usize> {
        let compiled = selector::compile_selector(source, &mut self.atoms)?;
        self.selectors.push(compiled);
        Ok(self.selectors.len() - 1)
    }

    /// The compiled selectors accumulated so far.
    pub fn selectors(&self) -> &[CompiledSelector] {
        &self.selectors
    }

    /// Whether selector `sel_idx` matches `node`.
    ///
    /// Returns `Ok(false)` (not an error) for any out-of-range node, since
    /// the VM's own failure model treats malformed input as a non-match;
    /// an out-of-range *selector* index is the caller's bug and is reported
    /// as `IndexOutOfRange`.
    pub fn matches(&self, sel_idx: usize, node: NodeId) -> Result<bool> {
        let selector = self.selectors.get(sel_idx).ok_or(error::EngineError::IndexOutOfRange {
            what: "selector",
            index: sel_idx as u32,
            len: self.selectors.len() as u32,
        })?;
        if node.0 as usize >= self.tree.node_count() {
            return Ok(false);
        }
        Ok(selector::execute(selector.bytecode(), &self.tree, node))
    }

    /// Resolves every compiled selector against `node`, returning the index
    /// of the highest-specificity match (last-rule-wins on ties), or `None`.
    ///
    /// Uses the rightmost-key bucketing optimization
    /// (`selector::resolve_bucketed`) internally; this is a pure performance
    /// path that is differentially tested against the naive "run every
    /// program" implementation and must never change the result.
    pub fn resolve(&self, node: NodeId) -> Option<usize> {
        if node.0 as usize >= self.tree.node_count() {
            return None;
        }
        selector::resolve_bucketed(&self.selectors, &self.tree, node)
    }

    /// The specificity of a compiled selector, for callers implementing
    /// their own resolution policy on top of `matches`.
    pub fn specificity_of(&self, sel_idx: usize) -> Option<Specificity> {
        self.selectors.get(sel_idx).map(CompiledSelector::specificity)
    }
}
