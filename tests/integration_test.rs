/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use vecc::compile_source;

fn lines_containing<'a>(lines: &'a [String], needle: &str) -> Vec<&'a String> {
    lines.iter().filter(|l| l.contains(needle)).collect()
}

// S1: a constant-folded rhs assigned to a single scalar variable.
#[test]
fn s1_constant_fold_produces_a_single_mov() {
    let src = "int4 f() { int4 x; x = 2 + 3; return x; }";
    let lines = compile_source(src).expect("s1 should compile");
    assert!(!lines.is_empty());
    let movs = lines_containing(&lines, "mov");
    assert!(
        movs.iter().any(|l| l.contains("$5") || l.contains("5")),
        "expected a mov of the folded constant 5, got: {:?}",
        lines
    );
}

// S2: `a = b + 1` with b live afterward should select an add, not a bare mov.
#[test]
fn s2_add_with_constant_selects_add_instruction() {
    let src = "int4 f(int4 b) { int4 a; a = b + 1; return a + b; }";
    let lines = compile_source(src).expect("s2 should compile");
    assert!(lines_containing(&lines, "add").len() >= 1);
}

// S3: `a = b - a` with both operands already in registers selects sub/neg.
#[test]
fn s3_subtract_with_shared_operand_selects_sub() {
    let src = "int4 f(int4 a, int4 b) { a = b - a; return a; }";
    let lines = compile_source(src).expect("s3 should compile");
    assert!(lines_containing(&lines, "sub").len() >= 1);
}

// S4: if/else over a comparison lowers to a compare, a conditional jump and
// two arms joined by a label, with no phi nodes surviving into the output.
#[test]
fn s4_if_else_lowers_to_compare_and_conditional_jump() {
    let src = "int4 f(int4 a, int4 b) { if (a < b) { a = 1; } else { a = 2; } return a; }";
    let lines = compile_source(src).expect("s4 should compile");
    assert!(lines_containing(&lines, "cmp").len() >= 1);
    let cond_jumps: Vec<_> = lines
        .iter()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("j") && !t.starts_with("jmp")
        })
        .collect();
    assert!(!cond_jumps.is_empty(), "expected a conditional jump, got: {:?}", lines);
    assert!(!lines.iter().any(|l| l.contains("phi")));
}

// S5: a for-loop accumulating into s produces a loop body with no phi nodes
// left after elimination, and at least one back-edge jump.
#[test]
fn s5_for_loop_has_no_surviving_phis() {
    let src = "int4 f() { int4 i; int4 s; for (i = 0; i < 10; i = i + 1) { s = s + i; } return s; }";
    let lines = compile_source(src).expect("s5 should compile");
    assert!(!lines.iter().any(|l| l.contains("phi")));
    assert!(lines_containing(&lines, "jmp").len() >= 1);
}

// S6: a diamond where both arms assign the same variable joins through a
// single merged register with no phi surviving.
#[test]
fn s6_diamond_join_has_no_surviving_phis() {
    let src = "int4 f(int4 cond) { int4 x; if (cond) { x = 1; } else { x = 2; } return x; }";
    let lines = compile_source(src).expect("s6 should compile");
    assert!(!lines.is_empty());
    assert!(!lines.iter().any(|l| l.contains("phi")));
}

#[test]
fn straight_line_arithmetic_compiles_end_to_end() {
    let src = "int4 f(int4 a, int4 b) { int4 c; c = a + b * 2; return c; }";
    let lines = compile_source(src).expect("straight line should compile");
    assert!(!lines.is_empty());
}

#[test]
fn while_loop_compiles_end_to_end() {
    let src = "int4 f(int4 n) { int4 i; i = 0; while (i < n) { i = i + 1; } return i; }";
    let lines = compile_source(src).expect("while loop should compile");
    assert!(!lines.is_empty());
    assert!(lines_containing(&lines, "cmp").len() >= 1);
}

#[test]
fn do_while_loop_compiles_end_to_end() {
    let src = "int4 f(int4 n) { int4 i; i = 0; do { i = i + 1; } while (i < n); return i; }";
    let lines = compile_source(src).expect("do-while loop should compile");
    assert!(!lines.is_empty());
}

#[test]
fn void_procedure_with_no_return_value_compiles() {
    let src = "void f(int4 a) { int4 b; b = a + 1; return; }";
    let lines = compile_source(src).expect("void procedure should compile");
    assert!(!lines.is_empty());
}

#[test]
fn nested_if_without_else_compiles() {
    let src = "int4 f(int4 a, int4 b) { int4 c; c = 0; if (a < b) { if (a > 0) { c = 1; } } return c; }";
    let lines = compile_source(src).expect("nested if should compile");
    assert!(!lines.is_empty());
}

#[test]
fn break_and_continue_inside_a_loop_compile() {
    let src = "int4 f(int4 n) { int4 i; int4 s; i = 0; s = 0; while (i < n) { i = i + 1; if (i == 5) { continue; } if (i == 8) { break; } s = s + i; } return s; }";
    let lines = compile_source(src).expect("break/continue should compile");
    assert!(!lines.is_empty());
}

#[test]
fn goto_to_a_declared_label_compiles() {
    let src = "int4 f(int4 a) { int4 b; b = 0; goto skip; b = 1; skip: return b; }";
    let lines = compile_source(src).expect("goto should compile");
    assert!(!lines.is_empty());
}

#[test]
fn empty_source_is_a_parse_error() {
    let result = compile_source("");
    assert!(result.is_err(), "expected empty source to fail with no procedures defined");
}

#[test]
fn goto_to_an_undefined_label_is_an_error() {
    let src = "int4 f() { int4 x; x = 0; goto nowhere; return x; }";
    let result = compile_source(src);
    assert!(result.is_err(), "expected a jump to an undeclared label to fail");
}

#[test]
fn switch_statement_is_rejected() {
    let src = "int4 f(int4 a) { switch (a) { case 1: return 1; } return 0; }";
    let result = compile_source(src);
    assert!(result.is_err(), "switch/case is not supported and should fail to parse");
}

#[test]
fn unterminated_block_comment_is_a_lex_error() {
    let src = "int4 f() { /* never closes\n int4 x; return x; }";
    let result = compile_source(src);
    assert!(result.is_err());
}

#[test]
fn compiling_the_same_source_twice_is_deterministic() {
    let src = "int4 f(int4 a, int4 b) { int4 c; c = a + b; return c; }";
    let first = compile_source(src).expect("first compile");
    let second = compile_source(src).expect("second compile");
    assert_eq!(first, second);
}
