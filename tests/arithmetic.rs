//! Scenario 1 from the evaluator's end-to-end table: operator precedence.

use lapis::eval_to_string;

#[test]
fn operator_precedence_multiplies_before_adding() {
    assert_eq!(eval_to_string("1 + 2 * 3;"), "7");
}

#[test]
fn array_length_builtin() {
    assert_eq!(eval_to_string("var a = [1,2,3]; a.length();"), "3");
}
