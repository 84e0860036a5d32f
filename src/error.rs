//! Error types shared by every layer of the engine.
//!
//! Only input-bound errors are represented here: oversized atoms, oversized
//! class lists, out-of-range indices, and size-conversion overflow. There is
//! no allocation-failure variant — every arena here is a plain `Vec`, whose
//! allocator aborts the process on OOM rather than returning a `Result`, so
//! a recoverable "allocation failed" case would never actually be reachable.
//! Malformed bytecode and unknown opcodes are never surfaced as `Err` either
//! — the matching VM folds them into a `false` result by design, so that a
//! query over any tree with any bytecode is total.

use thiserror::Error;

/// Result alias used throughout the engine's build-phase API.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced while building a session (interning, tree construction,
/// selector compilation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An atom table input exceeded the 64 KiB limit.
    #[error("string of {len} bytes exceeds the 65535-byte atom length limit")]
    StringTooLong {
        /// The length of the rejected input, in bytes.
        len: usize,
    },

    /// `set_classes` was given more than 255 classes for a single node.
    #[error("node would have {count} classes, exceeding the 255-class limit")]
    TooManyClasses {
        /// The number of classes that was rejected.
        count: usize,
    },

    /// A node id, parent id, or selector index was out of range for the
    /// session it was used against.
    #[error("{what} index {index} is out of range (session has {len})")]
    IndexOutOfRange {
        /// What kind of index this was (`"node"`, `"selector"`, ...).
        what: &'static str,
        /// The offending index.
        index: u32,
        /// The number of valid entries at the time of the call.
        len: u32,
    },

    /// A size computation overflowed while converting between the engine's
    /// internal integer widths (e.g. more than u32::MAX atoms interned).
    #[error("size overflow while {context}")]
    SizeOverflow {
        /// A short description of the operation that overflowed.
        context: &'static str,
    },

    /// The selector source could not be parsed at all (as opposed to
    /// containing an unsupported but ignorable pseudo-class).
    #[error("selector syntax error at byte {pos}: {message}")]
    SelectorSyntax {
        /// Byte offset into the source where parsing gave up.
        pos: usize,
        /// A human-readable description of the problem.
        message: String,
    },
}
