//! Scenario 4, plus a nested-instance variant from the additional scenario
//! table: constructors, instance fields, and bound methods.

use lapis::eval_to_string;

#[test]
fn constructor_and_method() {
    let src = "
        class P()
            func init(n) this.n = n; end
            func g() return this.n; end
        end
        var p = P(10);
        p.g();
    ";
    assert_eq!(eval_to_string(src), "10");
}

#[test]
fn fields_mutate_in_place() {
    let src = "
        class Counter()
            func init() this.n = 0; end
            func inc() this.n = this.n + 1; end
        end
        var c = Counter();
        c.inc();
        c.inc();
        c.n;
    ";
    assert_eq!(eval_to_string(src), "2");
}

#[test]
fn an_instance_held_as_another_instances_field() {
    let src = "
        class A()
            func init() this.x = 1; end
            func get() return this.x; end
        end
        class B()
            func init() this.a = A(); end
        end
        var b = B();
        b.a.get();
    ";
    assert_eq!(eval_to_string(src), "1");
}
