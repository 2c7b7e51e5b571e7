//! Additional scenario 7: dictionary literals, trailing commas, and the
//! missing-key-returns-null indexing rule.

use lapis::eval_to_string;

#[test]
fn trailing_comma_and_member_access() {
    assert_eq!(eval_to_string("var d = {a: 1, b: 2,}; d.a;"), "1");
}

#[test]
fn bracket_index_on_a_missing_key_is_null() {
    assert_eq!(eval_to_string("var d = {a: 1}; d[\"missing\"];"), "null");
}

#[test]
fn keys_preserve_insertion_order_in_display() {
    assert_eq!(eval_to_string("{b: 2, a: 1};"), "{b: 2, a: 1}");
}

#[test]
fn string_keyed_dictionary_entry_can_be_assigned() {
    assert_eq!(eval_to_string("var d = {a: 1}; d[\"a\"] = 9; d.a;"), "9");
}
