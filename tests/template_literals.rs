//! Scenario 3: template literal interpolation re-parses and re-evaluates
//! each `{expr}` region against the current scope.

use lapis::eval_to_string;

#[test]
fn embedded_expression_sees_the_current_binding() {
    assert_eq!(eval_to_string("var n = 5; `n is {n+1}`;"), "n is 6");
}

#[test]
fn text_segments_pass_through_verbatim() {
    assert_eq!(eval_to_string("var name = \"Ada\"; `hello, {name}!`;"), "hello, Ada!");
}
