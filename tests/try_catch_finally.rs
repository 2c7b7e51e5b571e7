//! Scenario 5: a caught runtime error still runs `finally`.

use lapis::eval_to_string;

#[test]
fn caught_error_then_finally_in_order() {
    let src = r#"
        var log = [];
        try
            Console.error("boom");
        catch (e)
            log.push("caught");
        finally
            log.push("done");
        end
        log.join(",");
    "#;
    assert_eq!(eval_to_string(src), "caught,done");
}

#[test]
fn finally_runs_before_an_uncaught_error_propagates() {
    let src = r#"
        try
            Console.error("boom");
        finally
            Console.print("ran finally");
        end
    "#;
    let output = eval_to_string(src);
    assert!(output.starts_with("error [LAP4004]"), "got: {output}");
}

#[test]
fn finally_runs_on_the_ordinary_success_path_too() {
    let src = r#"
        var ran = false;
        try
            1 + 1;
        finally
            ran = true;
        end
        ran;
    "#;
    assert_eq!(eval_to_string(src), "true");
}
