//! Snapshot tests over bytecode disassembly, to make the compiler's emitted
//! instruction sequences reviewable (and their regressions visible) the same
//! way the teacher project snapshot-tests its HTML output.

use flatsel::atom::AtomTable;
use flatsel::selector::{compile_selector, disassemble};
use insta::assert_snapshot;

#[test]
fn single_class_compound() {
    let mut atoms = AtomTable::new();
    let compiled = compile_selector(".container", &mut atoms).unwrap();
    assert_snapshot!(disassemble(compiled.bytecode(), &atoms), @r###"
    0000: MATCH_CLASS "container"
    0005: MATCH_SUCCESS
    "###);
}

#[test]
fn child_combinator_compound() {
    let mut atoms = AtomTable::new();
    let compiled = compile_selector("div > span", &mut atoms).unwrap();
    assert_snapshot!(disassemble(compiled.bytecode(), &atoms), @r###"
    0000: MATCH_TAG "span"
    0005: COMB_CHILD
    0006: MATCH_TAG "div"
    0011: MATCH_SUCCESS
    "###);
}

#[test]
fn nth_child_formula_compound() {
    let mut atoms = AtomTable::new();
    let compiled = compile_selector("li:nth-child(2n+1)", &mut atoms).unwrap();
    assert_snapshot!(disassemble(compiled.bytecode(), &atoms), @r###"
    0000: MATCH_TAG "li"
    0005: PSEUDO_NTH_CHILD 2n+1
    0010: MATCH_SUCCESS
    "###);
}
