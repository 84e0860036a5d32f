//! The CLI's scenario file format: a small serde-driven JSON description of
//! one flat tree plus a list of selector-list strings to resolve against
//! every element in it.
//!
//! This is deliberately not an HTML/CSS parser (reading real HTML/CSS is out
//! of scope for the engine) — it is a harness over the engine's own
//! `create_element`/`set_id`/`set_classes`/`add_attribute`/
//! `compile_selector_list` surface, closely mirroring how a real DOM would be
//! described.

use std::collections::BTreeMap;

use serde::Deserialize;

use flatsel::tree::NodeId;
use flatsel::Session;

/// One node in a scenario's tree, as read from JSON.
#[derive(Debug, Deserialize)]
pub struct SceneNode {
    /// The element's tag name. Absent for a bare text node.
    #[serde(default)]
    pub tag: Option<String>,
    /// The element's id, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// The element's classes, in source order.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Attribute name/value pairs, applied in map order.
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Literal text content; when present (and `tag` is absent) this node
    /// becomes a text node instead of an element.
    #[serde(default)]
    pub text: Option<String>,
    /// Child nodes, in document order.
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

/// A full scenario file: a tree to build plus the selectors to resolve
/// against every element in it.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// The root of the tree to build. May itself have siblings in a real
    /// document, but a scenario models a single subtree.
    pub tree: SceneNode,
    /// Selector-list strings (each may itself contain top-level commas),
    /// compiled in order and fed to `Session::resolve`.
    pub selectors: Vec<String>,
}

/// One element built from a scenario, paired with a human-readable label
/// (its tag, id and classes) for reporting.
pub struct BuiltElement {
    /// The node id this scenario element was assigned in the session.
    pub node: NodeId,
    /// A CSS-ish label like `div#main.container` for display purposes.
    pub label: String,
}

/// Builds `scenario.tree` into `session`, returning every element created,
/// in document order, and compiles `scenario.selectors` into the session.
///
/// Returns the built elements and the selector indices in source order (one
/// entry per selector-list string; each may expand to several indices if its
/// string contained top-level commas).
pub fn load(session: &mut Session, scenario: &Scenario) -> anyhow::Result<(Vec<BuiltElement>, Vec<Vec<usize>>)> {
    let mut elements = Vec::new();
    build_node(session, &scenario.tree, NodeId::NONE, &mut elements)?;

    let mut selector_indices = Vec::with_capacity(scenario.selectors.len());
    for source in &scenario.selectors {
        selector_indices.push(session.compile_selector_list(source)?);
    }

    Ok((elements, selector_indices))
}

fn build_node(
    session: &mut Session,
    node: &SceneNode,
    parent: NodeId,
    elements: &mut Vec<BuiltElement>,
) -> anyhow::Result<()> {
    match (&node.tag, &node.text) {
        (Some(tag), _) => {
            let tag_atom = session.intern(tag.as_bytes())?;
            let id = session.create_element(tag_atom, parent)?;

            let mut label = tag.clone();
            if let Some(node_id) = &node.id {
                let id_atom = session.intern(node_id.as_bytes())?;
                session.set_id(id, id_atom)?;
                label.push('#');
                label.push_str(node_id);
            }
            if !node.classes.is_empty() {
                let mut class_atoms = Vec::with_capacity(node.classes.len());
                for class in &node.classes {
                    class_atoms.push(session.intern(class.as_bytes())?);
                    label.push('.');
                    label.push_str(class);
                }
                session.set_classes(id, &class_atoms)?;
            }
            for (name, value) in &node.attrs {
                let name_atom = session.intern(name.as_bytes())?;
                session.add_attribute(id, name_atom, value.as_bytes())?;
            }

            elements.push(BuiltElement { node: id, label });

            for child in &node.children {
                build_node(session, child, id, elements)?;
            }
        }
        (None, Some(text)) => {
            session.create_text(parent, text.as_bytes())?;
        }
        (None, None) => {
            anyhow::bail!("scenario node has neither a tag nor text content");
        }
    }
    Ok(())
}
