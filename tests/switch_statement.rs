//! Scenario 6: first matching case wins, comma-separated case values.

use lapis::eval_to_string;

#[test]
fn first_matching_case_list_wins() {
    let src = r#"
        var result = "";
        switch (2)
            case 1:
                result = "a";
            case 2, 3:
                result = "b";
            default:
                result = "c";
        end
        result;
    "#;
    assert_eq!(eval_to_string(src), "b");
}

#[test]
fn default_runs_when_nothing_matches() {
    let src = r#"
        var result = "";
        switch (99)
            case 1:
                result = "a";
            default:
                result = "c";
        end
        result;
    "#;
    assert_eq!(eval_to_string(src), "c");
}

#[test]
fn break_inside_a_case_does_not_fall_through() {
    let src = r#"
        var log = [];
        switch (1)
            case 1:
                log.push("one");
                break;
            case 2:
                log.push("two");
        end
        log.join(",");
    "#;
    assert_eq!(eval_to_string(src), "one");
}
