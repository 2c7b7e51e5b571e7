//! Additional scenarios 10-11: `while`/`for` control flow.

use lapis::eval_to_string;

#[test]
fn while_loop_accumulates() {
    let src = "
        var i = 0;
        var log = [];
        while (i < 3)
            log.push(i);
            i = i + 1;
        end
        log.join(\",\");
    ";
    assert_eq!(eval_to_string(src), "0,1,2");
}

#[test]
fn while_loop_break_and_continue() {
    let src = "
        var i = 0;
        var log = [];
        while (i < 5)
            i = i + 1;
            if (i == 2) continue; end
            if (i == 4) break; end
            log.push(i);
        end
        log.join(\",\");
    ";
    assert_eq!(eval_to_string(src), "1,3");
}

#[test]
fn for_in_binds_a_fresh_variable_per_iteration() {
    let src = "
        var xs = [1,2,3];
        var log = [];
        for x in xs
            log.push(x);
        end
        log.join(\",\");
    ";
    assert_eq!(eval_to_string(src), "1,2,3");
}

#[test]
fn for_in_over_a_non_array_is_an_error() {
    assert!(eval_to_string("for x in 5 end").starts_with("error"));
}
