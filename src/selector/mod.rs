//! Selector compilation and matching: the textual dialect, its bytecode
//! target, and the virtual machine that executes it.

pub mod bytecode;
pub mod compiler;
pub mod vm;

pub use bytecode::{disassemble, Specificity};
pub use compiler::{compile_selector, compile_selector_list, CompileDiagnostic, CompiledSelector, RightmostKey};
pub use vm::{execute, resolve, resolve_bucketed, MAX_BACKTRACK_DEPTH};
