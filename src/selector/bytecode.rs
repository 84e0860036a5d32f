//! The selector bytecode format: opcode constants and the tiny reader/writer
//! pair the compiler and VM share to move instructions in and out of a flat
//! `Vec<u8>`.
//!
//! Every instruction is a one-byte opcode followed by inline operands.
//! Attribute-value operands are the one place this deviates from a fixed
//! instruction width: `MATCH_ATTR_EQ` and its siblings embed the literal
//! value bytes directly (length-prefixed) rather than an atom id, because
//! the VM is deliberately given no atom table of its own (see
//! [`crate::selector::vm::execute`]) and prefix/suffix/substring matching
//! need the raw bytes regardless.

/// `matched := tag(n) == atom`. Operand: `atom: u32`.
pub const MATCH_TAG: u8 = 0x01;
/// `matched := id(n) == atom`. Operand: `atom: u32`.
pub const MATCH_ID: u8 = 0x02;
/// `matched := has_class(n, atom)`. Operand: `atom: u32`.
pub const MATCH_CLASS: u8 = 0x03;
/// Attribute presence. Operand: `name: u32`.
pub const MATCH_ATTR: u8 = 0x04;
/// Exact attribute value match. Operands: `name: u32`, `len: u16`, `bytes`.
pub const MATCH_ATTR_EQ: u8 = 0x05;
/// Whitespace-separated word match (`~=`). Operands as [`MATCH_ATTR_EQ`].
pub const MATCH_ATTR_WORD: u8 = 0x06;
/// Prefix match (`^=`). Operands as [`MATCH_ATTR_EQ`].
pub const MATCH_ATTR_PREFIX: u8 = 0x07;
/// Suffix match (`$=`). Operands as [`MATCH_ATTR_EQ`].
pub const MATCH_ATTR_SUFFIX: u8 = 0x08;
/// Substring match (`*=`). Operands as [`MATCH_ATTR_EQ`].
pub const MATCH_ATTR_SUBSTR: u8 = 0x09;
/// `matched := is_element(n)`. No operands.
pub const MATCH_ANY: u8 = 0x0A;

/// No previous sibling. No operands.
pub const PSEUDO_FIRST_CHILD: u8 = 0x10;
/// No next sibling. No operands.
pub const PSEUDO_LAST_CHILD: u8 = 0x11;
/// Both first- and last-child. No operands.
pub const PSEUDO_ONLY_CHILD: u8 = 0x12;
/// `An+B` vs. forward index. Operands: `a: i16`, `b: i16`.
pub const PSEUDO_NTH_CHILD: u8 = 0x13;
/// `An+B` vs. backward index. Operands: `a: i16`, `b: i16`.
pub const PSEUDO_NTH_LAST_CHILD: u8 = 0x14;
/// No first child. No operands.
pub const PSEUDO_EMPTY: u8 = 0x15;
/// No parent. No operands.
pub const PSEUDO_ROOT: u8 = 0x16;

/// Walk to parent, with backtracking. No operands.
pub const COMB_DESCENDANT: u8 = 0x20;
/// Walk to parent once, no backtrack. No operands.
pub const COMB_CHILD: u8 = 0x21;
/// Walk to the previous element sibling. No operands.
pub const COMB_ADJACENT: u8 = 0x22;
/// Walk to any earlier sibling. No operands.
pub const COMB_SIBLING: u8 = 0x23;

/// Jump if `matched` is false. Operand: `offset: i16`, relative to the byte
/// past the offset itself.
pub const JUMP_FAIL: u8 = 0x30;
/// Unconditional jump. Operand as [`JUMP_FAIL`].
pub const JUMP: u8 = 0x31;
/// Unconditional alternative-branch jump. Operand as [`JUMP_FAIL`]. Reserved
/// for selector-list alternation within one program; the textual compiler in
/// this crate never emits it (comma-separated branches become independent
/// programs instead), but the VM supports it for bytecode built some other
/// way.
pub const JUMP_ALT: u8 = 0x32;

/// Early-reject via `ancestor_filter(current).might_contain(hash)`.
/// Operand: `hash: u32`.
pub const BLOOM_CHECK_CLASS: u8 = 0x40;
/// See [`BLOOM_CHECK_CLASS`].
pub const BLOOM_CHECK_ID: u8 = 0x41;
/// See [`BLOOM_CHECK_CLASS`].
pub const BLOOM_CHECK_TAG: u8 = 0x42;

/// Terminal: the program matched.
pub const MATCH_SUCCESS: u8 = 0xFE;
/// Terminal: the program did not match.
pub const MATCH_FAIL: u8 = 0xFF;

/// Appends instructions to a bytecode buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// A writer with no instructions yet.
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    /// The current length, used to compute jump offsets.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends a bare opcode with no operands.
    pub fn op(&mut self, opcode: u8) -> &mut Self {
        self.buf.push(opcode);
        self
    }

    /// Appends an opcode with one `u32` operand.
    pub fn op_u32(&mut self, opcode: u8, operand: u32) -> &mut Self {
        self.buf.push(opcode);
        self.buf.extend_from_slice(&operand.to_le_bytes());
        self
    }

    /// Appends an opcode with two `i16` operands (the nth-child formula).
    pub fn op_i16_pair(&mut self, opcode: u8, a: i16, b: i16) -> &mut Self {
        self.buf.push(opcode);
        self.buf.extend_from_slice(&a.to_le_bytes());
        self.buf.extend_from_slice(&b.to_le_bytes());
        self
    }

    /// Appends an attribute-matching opcode: `name`, then a length-prefixed
    /// literal value.
    pub fn op_attr(&mut self, opcode: u8, name: u32, value: &[u8]) -> &mut Self {
        self.buf.push(opcode);
        self.buf.extend_from_slice(&name.to_le_bytes());
        self.buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    /// Appends an opcode with one `i16` relative jump offset.
    pub fn op_jump(&mut self, opcode: u8, offset: i16) -> &mut Self {
        self.buf.push(opcode);
        self.buf.extend_from_slice(&offset.to_le_bytes());
        self
    }

    /// Prepends instructions already written elsewhere (used for the
    /// optional Bloom-check hoist, which must sit before everything else).
    pub fn prepend(&mut self, prefix: &[u8]) {
        let mut combined = Vec::with_capacity(prefix.len() + self.buf.len());
        combined.extend_from_slice(prefix);
        combined.extend_from_slice(&self.buf);
        self.buf = combined;
    }

    /// Consumes the writer, returning the finished bytecode.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads operands out of a bytecode slice at a given offset. Returns `None`
/// on truncated or malformed input; callers treat that as a VM-level
/// non-match rather than an error, per the crate's failure model.
pub fn read_u32(program: &[u8], at: usize) -> Option<u32> {
    program.get(at..at + 4).map(|b| u32::from_le_bytes(b.try_into().unwrap()))
}

/// Reads a little-endian `i16` at `at`.
pub fn read_i16(program: &[u8], at: usize) -> Option<i16> {
    program.get(at..at + 2).map(|b| i16::from_le_bytes(b.try_into().unwrap()))
}

/// Reads a little-endian `u16` at `at`.
pub fn read_u16(program: &[u8], at: usize) -> Option<u16> {
    program.get(at..at + 2).map(|b| u16::from_le_bytes(b.try_into().unwrap()))
}

/// Reads a name (`u32`) plus a length-prefixed value literal starting at
/// `at`, returning `(name, value_bytes, bytes_consumed)`.
pub fn read_attr_operands(program: &[u8], at: usize) -> Option<(u32, &[u8], usize)> {
    let name = read_u32(program, at)?;
    let vlen = read_u16(program, at + 4)? as usize;
    let value = program.get(at + 6..at + 6 + vlen)?;
    Some((name, value, 6 + vlen))
}

/// A packed CSS specificity: `(a << 16) | (b << 8) | c`, each component
/// saturating at 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity(pub u32);

impl Specificity {
    /// The zero specificity (e.g. a bare `*`).
    pub const ZERO: Specificity = Specificity(0);

    /// Packs `(ids, classes_etc, tags)` into one value, saturating each
    /// component at 255 before packing.
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Specificity((a.min(255) << 16) | (b.min(255) << 8) | c.min(255))
    }

    /// Adds one to the id (`a`) component, saturating.
    pub fn add_id(&mut self) {
        *self = Self::new(self.a() + 1, self.b(), self.c());
    }

    /// Adds one to the class/attribute/pseudo (`b`) component, saturating.
    pub fn add_class(&mut self) {
        *self = Self::new(self.a(), self.b() + 1, self.c());
    }

    /// Adds one to the tag (`c`) component, saturating.
    pub fn add_tag(&mut self) {
        *self = Self::new(self.a(), self.b(), self.c() + 1);
    }

    /// The id-selector count.
    pub fn a(self) -> u32 {
        (self.0 >> 16) & 0xFF
    }

    /// The class/attribute/pseudo-selector count.
    pub fn b(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    /// The tag-selector count.
    pub fn c(self) -> u32 {
        self.0 & 0xFF
    }
}

/// Renders a compiled program as one mnemonic per line, resolving atom
/// operands back to their source text via `atoms`. Used by the disassembly
/// snapshot tests (`tests/disasm.rs`) and by anything printing a selector
/// for debugging; not consulted by the VM itself.
pub fn disassemble(program: &[u8], atoms: &crate::atom::AtomTable) -> String {
    use crate::atom::AtomId;

    let name_of = |atom: u32| -> String {
        atoms
            .string_of(AtomId(atom))
            .map(|b| format!("{:?}", String::from_utf8_lossy(b)))
            .unwrap_or_else(|| "<null>".to_string())
    };

    let mut out = String::new();
    let mut ip = 0usize;
    while ip < program.len() {
        let opcode = program[ip];
        let line = match opcode {
            MATCH_TAG => read_u32(program, ip + 1).map(|a| (format!("MATCH_TAG {}", name_of(a)), 5)),
            MATCH_ID => read_u32(program, ip + 1).map(|a| (format!("MATCH_ID {}", name_of(a)), 5)),
            MATCH_CLASS => read_u32(program, ip + 1).map(|a| (format!("MATCH_CLASS {}", name_of(a)), 5)),
            MATCH_ATTR => read_u32(program, ip + 1).map(|a| (format!("MATCH_ATTR {}", name_of(a)), 5)),
            MATCH_ATTR_EQ | MATCH_ATTR_WORD | MATCH_ATTR_PREFIX | MATCH_ATTR_SUFFIX | MATCH_ATTR_SUBSTR => {
                read_attr_operands(program, ip + 1).map(|(name, value, consumed)| {
                    let mnemonic = match opcode {
                        MATCH_ATTR_EQ => "MATCH_ATTR_EQ",
                        MATCH_ATTR_WORD => "MATCH_ATTR_WORD",
                        MATCH_ATTR_PREFIX => "MATCH_ATTR_PREFIX",
                        MATCH_ATTR_SUFFIX => "MATCH_ATTR_SUFFIX",
                        _ => "MATCH_ATTR_SUBSTR",
                    };
                    (
                        format!("{mnemonic} {} {:?}", name_of(name), String::from_utf8_lossy(value)),
                        1 + consumed,
                    )
                })
            }
            MATCH_ANY => Some(("MATCH_ANY".to_string(), 1)),
            PSEUDO_FIRST_CHILD => Some(("PSEUDO_FIRST_CHILD".to_string(), 1)),
            PSEUDO_LAST_CHILD => Some(("PSEUDO_LAST_CHILD".to_string(), 1)),
            PSEUDO_ONLY_CHILD => Some(("PSEUDO_ONLY_CHILD".to_string(), 1)),
            PSEUDO_NTH_CHILD | PSEUDO_NTH_LAST_CHILD => {
                let (Some(a), Some(b)) = (read_i16(program, ip + 1), read_i16(program, ip + 3)) else {
                    break;
                };
                let mnemonic = if opcode == PSEUDO_NTH_CHILD { "PSEUDO_NTH_CHILD" } else { "PSEUDO_NTH_LAST_CHILD" };
                Some((format!("{mnemonic} {a}n{b:+}"), 5))
            }
            PSEUDO_EMPTY => Some(("PSEUDO_EMPTY".to_string(), 1)),
            PSEUDO_ROOT => Some(("PSEUDO_ROOT".to_string(), 1)),
            COMB_DESCENDANT => Some(("COMB_DESCENDANT".to_string(), 1)),
            COMB_CHILD => Some(("COMB_CHILD".to_string(), 1)),
            COMB_ADJACENT => Some(("COMB_ADJACENT".to_string(), 1)),
            COMB_SIBLING => Some(("COMB_SIBLING".to_string(), 1)),
            JUMP_FAIL | JUMP | JUMP_ALT => read_i16(program, ip + 1).map(|off| {
                let mnemonic = match opcode {
                    JUMP_FAIL => "JUMP_FAIL",
                    JUMP => "JUMP",
                    _ => "JUMP_ALT",
                };
                (format!("{mnemonic} {off:+}"), 3)
            }),
            BLOOM_CHECK_CLASS | BLOOM_CHECK_ID | BLOOM_CHECK_TAG => read_u32(program, ip + 1).map(|hash| {
                let mnemonic = match opcode {
                    BLOOM_CHECK_CLASS => "BLOOM_CHECK_CLASS",
                    BLOOM_CHECK_ID => "BLOOM_CHECK_ID",
                    _ => "BLOOM_CHECK_TAG",
                };
                (format!("{mnemonic} {hash:#010x}"), 5)
            }),
            MATCH_SUCCESS => Some(("MATCH_SUCCESS".to_string(), 1)),
            MATCH_FAIL => Some(("MATCH_FAIL".to_string(), 1)),
            other => Some((format!("UNKNOWN {other:#04x}"), 1)),
        };
        let Some((text, width)) = line else { break };
        out.push_str(&format!("{ip:04}: {text}\n"));
        ip += width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_packs_and_saturates() {
        let mut s = Specificity::ZERO;
        s.add_id();
        s.add_class();
        s.add_class();
        s.add_tag();
        assert_eq!((s.a(), s.b(), s.c()), (1, 2, 1));

        for _ in 0..300 {
            s.add_id();
        }
        assert_eq!(s.a(), 255);
    }

    #[test]
    fn writer_round_trips_u32_operand() {
        let mut w = Writer::new();
        w.op_u32(MATCH_TAG, 0xDEAD_BEEF);
        let bytes = w.finish();
        assert_eq!(bytes[0], MATCH_TAG);
        assert_eq!(read_u32(&bytes, 1), Some(0xDEAD_BEEF));
    }

    #[test]
    fn writer_round_trips_attr_operand() {
        let mut w = Writer::new();
        w.op_attr(MATCH_ATTR_PREFIX, 7, b"flex-");
        let bytes = w.finish();
        assert_eq!(bytes[0], MATCH_ATTR_PREFIX);
        let (name, value, consumed) = read_attr_operands(&bytes, 1).unwrap();
        assert_eq!(name, 7);
        assert_eq!(value, b"flex-");
        assert_eq!(1 + consumed, bytes.len());
    }
}
