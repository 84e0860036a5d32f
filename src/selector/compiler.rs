//! Compiles the textual selector dialect into bytecode.
//!
//! The grammar is a deliberately small subset of CSS selectors: tag, class,
//! id, universal, a fixed set of structural pseudo-classes plus
//! `:nth-child`/`:nth-last-child`, attribute selectors, and the four
//! combinators. See the crate-level docs for the exact grammar; this module
//! only implements it.

use crate::atom::{AtomId, AtomTable};
use crate::error::{EngineError, Result};
use crate::selector::bytecode::{self, Specificity, Writer};

/// The dominant simple selector of a compiled selector's rightmost compound
/// (the one tested directly against the candidate node) — id, else class,
/// else tag, else "no cheap key available". Mirrors the rule-set indexing
/// classic style engines build over stylesheets, keyed the same way as the
/// compiler's leftmost Bloom hint: id over class over tag.
///
/// This is purely an indexing aid for [`crate::selector::vm::resolve_bucketed`];
/// it never changes whether a selector matches, only which selectors are
/// worth running the VM over for a given node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightmostKey {
    /// No id/class/tag requirement on the rightmost compound (e.g. `*` or a
    /// compound made only of pseudo-classes): every node is a candidate.
    Any,
    /// The rightmost compound requires this tag.
    Tag(AtomId),
    /// The rightmost compound requires this id.
    Id(AtomId),
    /// The rightmost compound requires this class.
    Class(AtomId),
}

/// A single compiled selector branch, ready for the matching VM.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    bytecode: Vec<u8>,
    specificity: Specificity,
    source: Option<String>,
    diagnostics: Vec<CompileDiagnostic>,
    rightmost_key: RightmostKey,
}

impl CompiledSelector {
    /// The compiled program.
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// The packed specificity.
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// The original source text, if the caller asked for it to be kept.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Non-fatal compile-time notes (currently: unknown pseudo-classes).
    pub fn diagnostics(&self) -> &[CompileDiagnostic] {
        &self.diagnostics
    }

    /// The indexing key [`crate::selector::vm::resolve_bucketed`] uses to
    /// skip this selector without running the VM.
    pub fn rightmost_key(&self) -> RightmostKey {
        self.rightmost_key
    }
}

/// A non-fatal note produced while compiling a selector, e.g. an
/// unrecognized pseudo-class. Compilation always succeeds despite these;
/// hosts that want strictness can inspect [`CompiledSelector::diagnostics`]
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileDiagnostic {
    /// Byte offset into the source where the issue was found.
    pub pos: usize,
    /// A human-readable description.
    pub message: String,
}

/// Splits a comma-separated selector list and compiles each branch
/// independently, which is how multi-selector resolution (§ matching VM)
/// consumes a stylesheet-like string.
pub fn compile_selector_list(source: &str, atoms: &mut AtomTable) -> Result<Vec<CompiledSelector>> {
    split_top_level(source, b',')
        .into_iter()
        .map(|(branch, offset)| compile_selector_at(branch, offset, atoms))
        .collect()
}

/// Compiles a single selector (no top-level commas) into bytecode.
pub fn compile_selector(source: &str, atoms: &mut AtomTable) -> Result<CompiledSelector> {
    compile_selector_at(source, 0, atoms)
}

fn compile_selector_at(source: &str, base_offset: usize, atoms: &mut AtomTable) -> Result<CompiledSelector> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(EngineError::SelectorSyntax {
            pos: base_offset,
            message: "empty selector branch".to_string(),
        });
    }

    let parts = split_compounds(trimmed);
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    for part in parts {
        match part {
            Part::Compound(text) => compounds.push(text),
            Part::Combinator(c) => combinators.push(c),
        }
    }
    if compounds.is_empty() {
        return Err(EngineError::SelectorSyntax {
            pos: base_offset,
            message: "selector has no compounds".to_string(),
        });
    }

    let mut specificity = Specificity::ZERO;
    let mut diagnostics = Vec::new();
    let mut writer = Writer::new();
    let mut has_descendant = false;
    let mut rightmost_key = None;

    // Emit right-to-left: the rightmost compound (last in source) tests the
    // start node; combinators walk outward from there.
    for i in (0..compounds.len()).rev() {
        let simples = parse_compound(&compounds[i])?;
        if i == compounds.len() - 1 {
            rightmost_key = Some(rightmost_key_of(&simples, atoms)?);
        }
        emit_compound(&simples, atoms, &mut writer, &mut specificity, &mut diagnostics, base_offset)?;

        if i > 0 {
            let comb = combinators[i - 1];
            if comb == Combinator::Descendant {
                has_descendant = true;
            }
            writer.op(comb.opcode());
        }
    }
    writer.op(bytecode::MATCH_SUCCESS);

    if has_descendant {
        if let Some(hint) = leftmost_bloom_hint(&compounds[0], atoms)? {
            let mut prefix = Writer::new();
            prefix.op_u32(hint.0, hint.1);
            writer.prepend(&prefix.finish());
        }
    }

    Ok(CompiledSelector {
        bytecode: writer.finish(),
        specificity,
        source: Some(source.to_string()),
        diagnostics,
        rightmost_key: rightmost_key.unwrap_or(RightmostKey::Any),
    })
}

/// Computes the rightmost compound's dominant indexing key: id over class
/// over tag over "any", the same priority order [`leftmost_bloom_hint`] uses.
fn rightmost_key_of(simples: &[SimpleSelector], atoms: &mut AtomTable) -> Result<RightmostKey> {
    for simple in simples {
        if let SimpleSelector::Id(name) = simple {
            return Ok(RightmostKey::Id(atoms.intern(name.as_bytes())?));
        }
    }
    for simple in simples {
        if let SimpleSelector::Class(name) = simple {
            return Ok(RightmostKey::Class(atoms.intern(name.as_bytes())?));
        }
    }
    for simple in simples {
        if let SimpleSelector::Tag(name) = simple {
            return Ok(RightmostKey::Tag(atoms.intern(name.as_bytes())?));
        }
    }
    Ok(RightmostKey::Any)
}

/// Computes an optional `(opcode, hash)` Bloom-check hint for the leftmost
/// (ancestor-most) compound, preferring id over class over tag — a pure
/// performance hoist, never changing the boolean result (see the matching
/// VM's docs).
fn leftmost_bloom_hint(leftmost: &str, atoms: &mut AtomTable) -> Result<Option<(u8, u32)>> {
    let simples = parse_compound(leftmost)?;
    for simple in &simples {
        if let SimpleSelector::Id(name) = simple {
            let id = atoms.intern(name.as_bytes())?;
            return Ok(Some((bytecode::BLOOM_CHECK_ID, atoms.hash_of(id))));
        }
    }
    for simple in &simples {
        if let SimpleSelector::Class(name) = simple {
            let id = atoms.intern(name.as_bytes())?;
            return Ok(Some((bytecode::BLOOM_CHECK_CLASS, atoms.hash_of(id))));
        }
    }
    for simple in &simples {
        if let SimpleSelector::Tag(name) = simple {
            let id = atoms.intern(name.as_bytes())?;
            return Ok(Some((bytecode::BLOOM_CHECK_TAG, atoms.hash_of(id))));
        }
    }
    Ok(None)
}

fn emit_compound(
    simples: &[SimpleSelector],
    atoms: &mut AtomTable,
    writer: &mut Writer,
    specificity: &mut Specificity,
    diagnostics: &mut Vec<CompileDiagnostic>,
    base_offset: usize,
) -> Result<()> {
    if simples.is_empty() {
        writer.op(bytecode::MATCH_ANY);
        return Ok(());
    }

    for simple in simples {
        match simple {
            SimpleSelector::Universal => {
                writer.op(bytecode::MATCH_ANY);
            }
            SimpleSelector::Tag(name) => {
                let id = atoms.intern(name.as_bytes())?;
                writer.op_u32(bytecode::MATCH_TAG, id.0);
                specificity.add_tag();
            }
            SimpleSelector::Id(name) => {
                let id = atoms.intern(name.as_bytes())?;
                writer.op_u32(bytecode::MATCH_ID, id.0);
                specificity.add_id();
            }
            SimpleSelector::Class(name) => {
                let id = atoms.intern(name.as_bytes())?;
                writer.op_u32(bytecode::MATCH_CLASS, id.0);
                specificity.add_class();
            }
            SimpleSelector::Attr { name, op } => {
                let name_id = atoms.intern(name.as_bytes())?;
                match op {
                    AttrOp::Presence => {
                        writer.op_u32(bytecode::MATCH_ATTR, name_id.0);
                    }
                    AttrOp::Eq(v) => {
                        writer.op_attr(bytecode::MATCH_ATTR_EQ, name_id.0, v.as_bytes());
                    }
                    AttrOp::Word(v) => {
                        writer.op_attr(bytecode::MATCH_ATTR_WORD, name_id.0, v.as_bytes());
                    }
                    AttrOp::Prefix(v) => {
                        writer.op_attr(bytecode::MATCH_ATTR_PREFIX, name_id.0, v.as_bytes());
                    }
                    AttrOp::Suffix(v) => {
                        writer.op_attr(bytecode::MATCH_ATTR_SUFFIX, name_id.0, v.as_bytes());
                    }
                    AttrOp::Substr(v) => {
                        writer.op_attr(bytecode::MATCH_ATTR_SUBSTR, name_id.0, v.as_bytes());
                    }
                }
                specificity.add_class();
            }
            SimpleSelector::Pseudo(pseudo) => match pseudo {
                PseudoKind::FirstChild => {
                    writer.op(bytecode::PSEUDO_FIRST_CHILD);
                    specificity.add_class();
                }
                PseudoKind::LastChild => {
                    writer.op(bytecode::PSEUDO_LAST_CHILD);
                    specificity.add_class();
                }
                PseudoKind::OnlyChild => {
                    writer.op(bytecode::PSEUDO_ONLY_CHILD);
                    specificity.add_class();
                }
                PseudoKind::Empty => {
                    writer.op(bytecode::PSEUDO_EMPTY);
                    specificity.add_class();
                }
                PseudoKind::Root => {
                    writer.op(bytecode::PSEUDO_ROOT);
                    specificity.add_class();
                }
                PseudoKind::NthChild(a, b) => {
                    writer.op_i16_pair(bytecode::PSEUDO_NTH_CHILD, clamp_i16(*a), clamp_i16(*b));
                    specificity.add_class();
                }
                PseudoKind::NthLastChild(a, b) => {
                    writer.op_i16_pair(bytecode::PSEUDO_NTH_LAST_CHILD, clamp_i16(*a), clamp_i16(*b));
                    specificity.add_class();
                }
                PseudoKind::Unknown(name) => {
                    diagnostics.push(CompileDiagnostic {
                        pos: base_offset,
                        message: format!("unknown pseudo-class :{name}, ignored"),
                    });
                }
            },
        }
    }
    Ok(())
}

fn clamp_i16(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

// -- lexical splitting ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

impl Combinator {
    fn opcode(self) -> u8 {
        match self {
            Combinator::Descendant => bytecode::COMB_DESCENDANT,
            Combinator::Child => bytecode::COMB_CHILD,
            Combinator::Adjacent => bytecode::COMB_ADJACENT,
            Combinator::Sibling => bytecode::COMB_SIBLING,
        }
    }
}

enum Part {
    Compound(String),
    Combinator(Combinator),
}

/// Splits `source` on whitespace/`>`/`+`/`~` at bracket depth 0 into
/// alternating compound-text and combinator parts, collapsing runs of
/// whitespace around an explicit combinator into that one combinator.
fn split_compounds(source: &str) -> Vec<Part> {
    let bytes = source.as_bytes();
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut depth = 0i32;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'(' | b'[' => {
                depth += 1;
                buf.push(b as char);
                i += 1;
            }
            b')' | b']' => {
                depth -= 1;
                buf.push(b as char);
                i += 1;
            }
            b'>' | b'+' | b'~' if depth == 0 => {
                if !buf.trim().is_empty() {
                    parts.push(Part::Compound(std::mem::take(&mut buf)));
                } else {
                    buf.clear();
                }
                let comb = match b {
                    b'>' => Combinator::Child,
                    b'+' => Combinator::Adjacent,
                    _ => Combinator::Sibling,
                };
                parts.push(Part::Combinator(comb));
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            _ if b.is_ascii_whitespace() && depth == 0 => {
                if !buf.trim().is_empty() {
                    parts.push(Part::Compound(std::mem::take(&mut buf)));
                }
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                // If the next non-whitespace char is an explicit
                // combinator, let the loop handle it next iteration
                // (no implied descendant in that case). Otherwise this
                // whitespace run *is* a descendant combinator.
                if i < bytes.len() && !matches!(bytes[i], b'>' | b'+' | b'~') {
                    parts.push(Part::Combinator(Combinator::Descendant));
                }
            }
            _ => {
                buf.push(b as char);
                i += 1;
            }
        }
    }
    if !buf.trim().is_empty() {
        parts.push(Part::Compound(buf));
    }
    parts
}

/// Splits `source` on `sep` at bracket/paren depth 0, returning each piece
/// with its byte offset into `source` (for diagnostics).
fn split_top_level(source: &str, sep: u8) -> Vec<(&str, usize)> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            _ if b == sep && depth == 0 => {
                out.push((&source[start..i], start));
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push((&source[start..], start));
    out
}

// -- compound parsing --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Tag(String),
    Id(String),
    Class(String),
    Universal,
    Attr { name: String, op: AttrOp },
    Pseudo(PseudoKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Presence,
    Eq(String),
    Word(String),
    Prefix(String),
    Suffix(String),
    Substr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PseudoKind {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Root,
    NthChild(i32, i32),
    NthLastChild(i32, i32),
    Unknown(String),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn parse_compound(text: &str) -> Result<Vec<SimpleSelector>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                out.push(SimpleSelector::Universal);
                i += 1;
            }
            b'.' => {
                i += 1;
                let (name, next) = read_ident(bytes, i);
                if name.is_empty() {
                    return Err(syntax_err(i, "expected class name after '.'"));
                }
                out.push(SimpleSelector::Class(name));
                i = next;
            }
            b'#' => {
                i += 1;
                let (name, next) = read_ident(bytes, i);
                if name.is_empty() {
                    return Err(syntax_err(i, "expected id name after '#'"));
                }
                out.push(SimpleSelector::Id(name));
                i = next;
            }
            b':' => {
                i += 1;
                let (name, mut next) = read_ident(bytes, i);
                if name.is_empty() {
                    return Err(syntax_err(i, "expected pseudo-class name after ':'"));
                }
                let mut args = None;
                if next < bytes.len() && bytes[next] == b'(' {
                    let close = bytes[next..].iter().position(|&c| c == b')').map(|p| p + next);
                    let close = close.ok_or_else(|| syntax_err(next, "unterminated pseudo-class argument"))?;
                    args = Some(text[next + 1..close].to_string());
                    next = close + 1;
                }
                out.push(SimpleSelector::Pseudo(lower_pseudo(&name, args)?));
                i = next;
            }
            b'[' => {
                let close = bytes[i..].iter().position(|&c| c == b']').map(|p| p + i);
                let close = close.ok_or_else(|| syntax_err(i, "unterminated attribute selector"))?;
                let inner = &text[i + 1..close];
                out.push(parse_attr_selector(inner, i)?);
                i = close + 1;
            }
            b if is_ident_start(b) => {
                let (name, next) = read_ident(bytes, i);
                out.push(SimpleSelector::Tag(name));
                i = next;
            }
            _ => {
                // Unknown character outside an identifier: skipped, per the
                // selector source grammar.
                i += 1;
            }
        }
    }
    Ok(out)
}

fn read_ident(bytes: &[u8], start: usize) -> (String, usize) {
    let mut i = start;
    if i < bytes.len() && is_ident_start(bytes[i]) {
        i += 1;
        while i < bytes.len() && is_ident_continue(bytes[i]) {
            i += 1;
        }
    }
    (String::from_utf8_lossy(&bytes[start..i]).into_owned(), i)
}

fn lower_pseudo(name: &str, args: Option<String>) -> Result<PseudoKind> {
    let lower = name.to_ascii_lowercase();
    Ok(match (lower.as_str(), args) {
        ("first-child", _) => PseudoKind::FirstChild,
        ("last-child", _) => PseudoKind::LastChild,
        ("only-child", _) => PseudoKind::OnlyChild,
        ("empty", _) => PseudoKind::Empty,
        ("root", _) => PseudoKind::Root,
        ("nth-child", Some(arg)) => {
            let (a, b) = parse_nth(&arg).ok_or_else(|| syntax_err(0, format!("invalid nth-child formula '{arg}'")))?;
            PseudoKind::NthChild(a, b)
        }
        ("nth-last-child", Some(arg)) => {
            let (a, b) =
                parse_nth(&arg).ok_or_else(|| syntax_err(0, format!("invalid nth-last-child formula '{arg}'")))?;
            PseudoKind::NthLastChild(a, b)
        }
        _ => PseudoKind::Unknown(name.to_string()),
    })
}

/// Parses an `An+B` micro-formula: `odd`, `even`, a bare integer, or
/// `[+-]?N?n([+-]N)?`.
fn parse_nth(input: &str) -> Option<(i32, i32)> {
    let s: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let s = s.to_ascii_lowercase();
    if s == "odd" {
        return Some((2, 1));
    }
    if s == "even" {
        return Some((2, 0));
    }
    match s.find('n') {
        Some(npos) => {
            let a_part = &s[..npos];
            let a: i32 = match a_part {
                "" => 1,
                "+" => 1,
                "-" => -1,
                _ => a_part.parse().ok()?,
            };
            let b_part = &s[npos + 1..];
            let b: i32 = if b_part.is_empty() { 0 } else { b_part.parse().ok()? };
            Some((a, b))
        }
        None => {
            let b: i32 = s.parse().ok()?;
            Some((0, b))
        }
    }
}

fn parse_attr_selector(inner: &str, pos: usize) -> Result<SimpleSelector> {
    let ops: &[(&str, fn(String) -> AttrOp)] = &[
        ("~=", AttrOp::Word as fn(String) -> AttrOp),
        ("^=", AttrOp::Prefix),
        ("$=", AttrOp::Suffix),
        ("*=", AttrOp::Substr),
        ("=", AttrOp::Eq),
    ];
    for (sym, ctor) in ops {
        if let Some(at) = inner.find(sym) {
            let name = inner[..at].trim().to_string();
            if name.is_empty() {
                return Err(syntax_err(pos, "attribute selector is missing a name"));
            }
            let raw = inner[at + sym.len()..].trim();
            let value = strip_quotes(raw).to_string();
            return Ok(SimpleSelector::Attr { name, op: ctor(value) });
        }
    }
    let name = inner.trim().to_string();
    if name.is_empty() {
        return Err(syntax_err(pos, "empty attribute selector"));
    }
    Ok(SimpleSelector::Attr { name, op: AttrOp::Presence })
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn syntax_err(pos: usize, message: impl Into<String>) -> EngineError {
    EngineError::SelectorSyntax { pos, message: message.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_of_div_class_id() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector("div.class#id", &mut atoms).unwrap();
        assert_eq!((compiled.specificity().a(), compiled.specificity().b(), compiled.specificity().c()), (1, 1, 1));
    }

    #[test]
    fn specificity_of_three_classes() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector(".a.b.c", &mut atoms).unwrap();
        assert_eq!((compiled.specificity().a(), compiled.specificity().b(), compiled.specificity().c()), (0, 3, 0));
    }

    #[test]
    fn specificity_of_universal_is_zero() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector("*", &mut atoms).unwrap();
        assert_eq!(compiled.specificity(), Specificity::ZERO);
    }

    #[test]
    fn selector_list_splits_on_top_level_comma() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector_list("div, span.item", &mut atoms).unwrap();
        assert_eq!(compiled.len(), 2);
    }

    #[test]
    fn nth_child_formula_parses_2n() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector("li:nth-child(2n)", &mut atoms).unwrap();
        assert_eq!(compiled.bytecode()[compiled.bytecode().len() - 6], bytecode::PSEUDO_NTH_CHILD);
    }

    #[test]
    fn unknown_pseudo_class_is_ignored_with_diagnostic() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector("div:hover", &mut atoms).unwrap();
        assert_eq!(compiled.diagnostics().len(), 1);
        assert!(compiled.diagnostics()[0].message.contains("hover"));
    }

    #[test]
    fn descendant_and_child_combinators_parse_distinctly() {
        let mut atoms = AtomTable::new();
        let descendant = compile_selector("div span", &mut atoms).unwrap();
        let child = compile_selector("div > span", &mut atoms).unwrap();
        assert!(descendant.bytecode().contains(&bytecode::COMB_DESCENDANT));
        assert!(child.bytecode().contains(&bytecode::COMB_CHILD));
        assert!(!child.bytecode().contains(&bytecode::COMB_DESCENDANT));
    }

    #[test]
    fn attribute_prefix_selector_compiles() {
        let mut atoms = AtomTable::new();
        let compiled = compile_selector("a[href^=\"https\"]", &mut atoms).unwrap();
        assert!(compiled.bytecode().contains(&bytecode::MATCH_ATTR_PREFIX));
    }

    #[test]
    fn rightmost_key_prefers_id_over_class_over_tag() {
        let mut atoms = AtomTable::new();
        let by_tag = compile_selector("div", &mut atoms).unwrap();
        assert!(matches!(by_tag.rightmost_key(), RightmostKey::Tag(_)));

        let by_class = compile_selector("div.item", &mut atoms).unwrap();
        assert!(matches!(by_class.rightmost_key(), RightmostKey::Class(_)));

        let by_id = compile_selector("div.item#main", &mut atoms).unwrap();
        assert!(matches!(by_id.rightmost_key(), RightmostKey::Id(_)));

        let universal = compile_selector("*", &mut atoms).unwrap();
        assert_eq!(universal.rightmost_key(), RightmostKey::Any);

        // The key comes from the rightmost compound, not the leftmost.
        let descendant = compile_selector("#ancestor span.item", &mut atoms).unwrap();
        assert!(matches!(descendant.rightmost_key(), RightmostKey::Class(_)));
    }
}
