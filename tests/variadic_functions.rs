//! Additional scenario 9: the trailing `**` parameter collects extra
//! positional arguments into an array.

use lapis::eval_to_string;

#[test]
fn trailing_arguments_collect_into_an_array() {
    let src = "func f(a, b**) return b.length(); end f(1,2,3,4);";
    assert_eq!(eval_to_string(src), "3");
}

#[test]
fn variadic_parameter_can_be_empty() {
    let src = "func f(a, b**) return b.length(); end f(1);";
    assert_eq!(eval_to_string(src), "0");
}

#[test]
fn fixed_arity_rejects_wrong_argument_count() {
    let src = "func f(a, b) return a + b; end f(1);";
    assert!(eval_to_string(src).starts_with("error [LAP3004]"));
}
