//! Additional scenario 12: `+` is overloaded between string concatenation
//! and numeric addition, picking string whenever either side is one.

use lapis::eval_to_string;

#[test]
fn two_strings_concatenate() {
    assert_eq!(eval_to_string(r#""a" + "b";"#), "ab");
}

#[test]
fn a_number_plus_a_string_coerces_to_string() {
    assert_eq!(eval_to_string(r#"1 + "x";"#), "1x");
}

#[test]
fn two_numbers_still_add_numerically() {
    assert_eq!(eval_to_string("1 + 2;"), "3");
}

#[test]
fn mismatched_non_string_operands_are_a_type_error() {
    assert!(eval_to_string("true + [1];").starts_with("error [LAP3001]"));
}
