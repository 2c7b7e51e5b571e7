//! Built-in instance methods for primitive values (string/number/boolean/
//! array). Each lookup produces a host-backed [`Value::Callable`] bound to
//! the receiver; the method only runs once it's actually called.

use std::collections::HashMap;
use std::rc::Rc;

use super::native;
use crate::error::{self, LapisResult};
use crate::source_map::Span;
use crate::value::{to_display_string, values_equal, Arity, Value};

pub fn string_method(receiver: Value, name: &str, span: Span) -> LapisResult<Value> {
    let s = match &receiver {
        Value::Str(s) => Rc::clone(s),
        _ => unreachable!("string_method called on non-string"),
    };

    Ok(match name {
        "length" => native("length", Arity::Fixed(0), move |_, _, _| Ok(Value::Int(s.chars().count() as i64))),
        "split" => {
            let s = Rc::clone(&s);
            native("split", Arity::Fixed(1), move |_, args, span| {
                let delimiter = expect_string(&args[0], span, "split() delimiter must be a string")?;
                let parts: Vec<Value> = s.split(delimiter.as_ref()).map(Value::str).collect();
                Ok(Value::array(parts))
            })
        }
        "replace" => {
            let s = Rc::clone(&s);
            native("replace", Arity::Fixed(2), move |_, args, span| {
                let old = expect_string(&args[0], span, "replace() arguments must be strings")?;
                let new = expect_string(&args[1], span, "replace() arguments must be strings")?;
                Ok(Value::str(s.replace(old.as_ref(), &new)))
            })
        }
        "contains" => {
            let s = Rc::clone(&s);
            native("contains", Arity::Fixed(1), move |_, args, span| {
                let needle = expect_string(&args[0], span, "contains() argument must be a string")?;
                Ok(Value::Bool(s.contains(needle.as_ref())))
            })
        }
        "toInt" => {
            let s = Rc::clone(&s);
            native("toInt", Arity::Fixed(0), move |_, _, span| {
                s.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| error::runtime(span, format!("cannot convert '{s}' to integer")))
            })
        }
        "toFloat" => {
            let s = Rc::clone(&s);
            native("toFloat", Arity::Fixed(0), move |_, _, span| {
                s.trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| error::runtime(span, format!("cannot convert '{s}' to float")))
            })
        }
        "toBool" => {
            let s = Rc::clone(&s);
            native("toBool", Arity::Fixed(0), move |_, _, span| match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(Value::Bool(false)),
                _ => Err(error::runtime(span, format!("cannot convert '{s}' to boolean"))),
            })
        }
        "toString" => {
            let s = Rc::clone(&s);
            native("toString", Arity::Fixed(0), move |_, _, _| Ok(Value::Str(Rc::clone(&s))))
        }
        "format" => {
            let s = Rc::clone(&s);
            native("format", Arity::Variadic(0), move |_, args, span| format_call(&s, args, span))
        }
        _ => return Err(error::no_property(span, "string", name)),
    })
}

fn format_call(template: &str, args: Vec<Value>, span: Span) -> LapisResult<Value> {
    let variables: HashMap<String, Value> = if args.len() == 1 {
        match &args[0] {
            Value::Dict(dict) => dict
                .borrow()
                .iter()
                .map(|(k, v)| (to_display_string(&k.to_value()), v.clone()))
                .collect(),
            _ => return Err(error::runtime(span, "format() arguments must be key-value pairs or a single dictionary")),
        }
    } else if args.len() % 2 == 0 {
        let mut map = HashMap::new();
        for pair in args.chunks(2) {
            let key = match &pair[0] {
                Value::Str(s) => s.to_string(),
                _ => return Err(error::runtime(span, "format variable names must be strings")),
            };
            map.insert(key, pair[1].clone());
        }
        map
    } else {
        return Err(error::runtime(span, "format() arguments must be key-value pairs or a single dictionary"));
    };

    Ok(Value::str(substitute_placeholders(template, &variables, span)?))
}

fn substitute_placeholders(template: &str, vars: &HashMap<String, Value>, span: Span) -> LapisResult<String> {
    let mut result = String::new();
    let mut i = 0;
    while i < template.len() {
        let rest = &template[i..];
        if let Some(stripped) = rest.strip_prefix('{') {
            if let Some(end) = stripped.find('}') {
                let name = &stripped[..end];
                if !name.is_empty() {
                    let value = vars.get(name).ok_or_else(|| error::runtime(span, format!("format variable '{name}' not provided")))?;
                    result.push_str(&to_display_string(value));
                    i += 2 + end;
                    continue;
                }
            }
        }
        let ch = rest.chars().next().expect("i < template.len()");
        result.push(ch);
        i += ch.len_utf8();
    }
    Ok(result)
}

fn expect_string(value: &Value, span: Span, message: &str) -> LapisResult<Rc<str>> {
    match value {
        Value::Str(s) => Ok(Rc::clone(s)),
        _ => Err(error::runtime(span, message)),
    }
}

pub fn number_method(receiver: Value, name: &str, span: Span) -> LapisResult<Value> {
    Ok(match name {
        "toString" => native("toString", Arity::Fixed(0), move |_, _, _| Ok(Value::str(to_display_string(&receiver)))),
        "toInt" => native("toInt", Arity::Fixed(0), move |_, _, _| Ok(Value::Int(receiver.as_f64().unwrap() as i64))),
        "toFloat" => native("toFloat", Arity::Fixed(0), move |_, _, _| Ok(Value::Float(receiver.as_f64().unwrap()))),
        "toBool" => native("toBool", Arity::Fixed(0), move |_, _, _| Ok(Value::Bool(receiver.as_f64().unwrap() != 0.0))),
        _ => return Err(error::no_property(span, "number", name)),
    })
}

pub fn boolean_method(receiver: Value, name: &str, span: Span) -> LapisResult<Value> {
    let b = match receiver {
        Value::Bool(b) => b,
        _ => unreachable!("boolean_method called on non-boolean"),
    };
    Ok(match name {
        "toString" => native("toString", Arity::Fixed(0), move |_, _, _| Ok(Value::str(if b { "true" } else { "false" }))),
        "toInt" => native("toInt", Arity::Fixed(0), move |_, _, _| Ok(Value::Int(if b { 1 } else { 0 }))),
        "toFloat" => native("toFloat", Arity::Fixed(0), move |_, _, _| Ok(Value::Float(if b { 1.0 } else { 0.0 }))),
        _ => return Err(error::no_property(span, "boolean", name)),
    })
}

pub fn array_method(receiver: Value, name: &str, span: Span) -> LapisResult<Value> {
    let items = match &receiver {
        Value::Array(items) => Rc::clone(items),
        _ => unreachable!("array_method called on non-array"),
    };

    Ok(match name {
        "map" => {
            let items = Rc::clone(&items);
            native("map", Arity::Fixed(1), move |interp, args, span| {
                let func = args[0].clone();
                let source = items.borrow().clone();
                let mut result = Vec::with_capacity(source.len());
                for item in source {
                    result.push(interp.invoke(func.clone(), vec![item], span)?);
                }
                Ok(Value::array(result))
            })
        }
        "filter" => {
            let items = Rc::clone(&items);
            native("filter", Arity::Fixed(1), move |interp, args, span| {
                let func = args[0].clone();
                let source = items.borrow().clone();
                let mut result = Vec::new();
                for item in source {
                    if interp.invoke(func.clone(), vec![item.clone()], span)?.is_truthy() {
                        result.push(item);
                    }
                }
                Ok(Value::array(result))
            })
        }
        "reduce" => {
            let items = Rc::clone(&items);
            native("reduce", Arity::Fixed(2), move |interp, args, span| {
                let func = args[0].clone();
                let mut accumulator = args[1].clone();
                for item in items.borrow().clone() {
                    accumulator = interp.invoke(func.clone(), vec![accumulator, item], span)?;
                }
                Ok(accumulator)
            })
        }
        "length" => {
            let items = Rc::clone(&items);
            native("length", Arity::Fixed(0), move |_, _, _| Ok(Value::Int(items.borrow().len() as i64)))
        }
        "push" => {
            let items = Rc::clone(&items);
            native("push", Arity::Variadic(0), move |_, args, _| {
                items.borrow_mut().extend(args);
                Ok(Value::Int(items.borrow().len() as i64))
            })
        }
        "pop" => {
            let items = Rc::clone(&items);
            native("pop", Arity::Fixed(0), move |_, _, _| Ok(items.borrow_mut().pop().unwrap_or(Value::Null)))
        }
        "shift" => {
            let items = Rc::clone(&items);
            native("shift", Arity::Fixed(0), move |_, _, _| {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(items.remove(0))
                }
            })
        }
        "unshift" => {
            let items = Rc::clone(&items);
            native("unshift", Arity::Variadic(0), move |_, args, _| {
                let mut items = items.borrow_mut();
                for (i, arg) in args.into_iter().enumerate() {
                    items.insert(i, arg);
                }
                Ok(Value::Int(items.len() as i64))
            })
        }
        "splice" => {
            let items = Rc::clone(&items);
            native("splice", Arity::Variadic(1), move |_, args, span| {
                let mut items = items.borrow_mut();
                let len = items.len();
                let start = to_index(&args[0], span, "splice() start index must be an integer")?;
                let start = clamp_start(start, len);
                let delete_count = if args.len() > 1 {
                    let raw = to_index(&args[1], span, "splice() delete count must be an integer")?;
                    raw.max(0).min((len - start) as i64) as usize
                } else {
                    len - start
                };
                let insert: Vec<Value> = args.into_iter().skip(2).collect();
                let deleted: Vec<Value> = items.splice(start..start + delete_count, insert).collect();
                Ok(Value::array(deleted))
            })
        }
        "slice" => {
            let items = Rc::clone(&items);
            native("slice", Arity::Variadic(0), move |_, args, span| {
                let source = items.borrow();
                let len = source.len();
                let start = if !args.is_empty() {
                    clamp_start(to_index(&args[0], span, "slice() start index must be an integer")?, len)
                } else {
                    0
                };
                let end = if args.len() > 1 {
                    let raw = to_index(&args[1], span, "slice() end index must be an integer")?;
                    clamp_start(raw, len).min(len)
                } else {
                    len
                };
                let end = end.max(start);
                Ok(Value::array(source[start..end].to_vec()))
            })
        }
        "indexOf" => {
            let items = Rc::clone(&items);
            native("indexOf", Arity::Variadic(1), move |_, args, span| {
                let source = items.borrow();
                let from = if args.len() > 1 {
                    clamp_start(to_index(&args[1], span, "indexOf() fromIndex must be an integer")?, source.len())
                } else {
                    0
                };
                for (i, item) in source.iter().enumerate().skip(from) {
                    if values_equal(item, &args[0]) {
                        return Ok(Value::Int(i as i64));
                    }
                }
                Ok(Value::Int(-1))
            })
        }
        "includes" => {
            let items = Rc::clone(&items);
            native("includes", Arity::Variadic(1), move |_, args, span| {
                let source = items.borrow();
                let from = if args.len() > 1 {
                    clamp_start(to_index(&args[1], span, "includes() fromIndex must be an integer")?, source.len())
                } else {
                    0
                };
                Ok(Value::Bool(source.iter().skip(from).any(|item| values_equal(item, &args[0]))))
            })
        }
        "reverse" => {
            let items = Rc::clone(&items);
            native("reverse", Arity::Fixed(0), move |_, _, _| {
                items.borrow_mut().reverse();
                Ok(Value::Array(Rc::clone(&items)))
            })
        }
        "sort" => {
            let items = Rc::clone(&items);
            native("sort", Arity::Variadic(0), move |interp, args, span| {
                let mut sorted = items.borrow().clone();
                if args.is_empty() {
                    sorted.sort_by(|a, b| to_display_string(a).cmp(&to_display_string(b)));
                } else {
                    let compare = args[0].clone();
                    let mut error = None;
                    sorted.sort_by(|a, b| {
                        if error.is_some() {
                            return std::cmp::Ordering::Equal;
                        }
                        match interp.invoke(compare.clone(), vec![a.clone(), b.clone()], span) {
                            Ok(result) => match result.as_f64() {
                                Some(n) if n < 0.0 => std::cmp::Ordering::Less,
                                Some(n) if n > 0.0 => std::cmp::Ordering::Greater,
                                Some(_) => std::cmp::Ordering::Equal,
                                None => {
                                    error = Some(error::runtime(span, "sort() compare function must return a number"));
                                    std::cmp::Ordering::Equal
                                }
                            },
                            Err(e) => {
                                error = Some(e);
                                std::cmp::Ordering::Equal
                            }
                        }
                    });
                    if let Some(e) = error {
                        return Err(e);
                    }
                }
                *items.borrow_mut() = sorted;
                Ok(Value::Array(Rc::clone(&items)))
            })
        }
        "join" => {
            let items = Rc::clone(&items);
            native("join", Arity::Variadic(0), move |_, args, _| {
                let separator = if args.is_empty() { ",".to_string() } else { to_display_string(&args[0]) };
                let rendered: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|v| if matches!(v, Value::Null) { String::new() } else { to_display_string(v) })
                    .collect();
                Ok(Value::str(rendered.join(&separator)))
            })
        }
        "concat" => {
            let items = Rc::clone(&items);
            native("concat", Arity::Variadic(0), move |_, args, _| {
                let mut result = items.borrow().clone();
                for arg in args {
                    match arg {
                        Value::Array(other) => result.extend(other.borrow().clone()),
                        other => result.push(other),
                    }
                }
                Ok(Value::array(result))
            })
        }
        _ => return Err(error::no_property(span, "array", name)),
    })
}

fn to_index(value: &Value, span: Span, message: &str) -> LapisResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        _ => Err(error::runtime(span, message)),
    }
}

fn clamp_start(raw: i64, len: usize) -> usize {
    if raw < 0 {
        (len as i64 + raw).max(0) as usize
    } else {
        (raw as usize).min(len)
    }
}

#[cfg(test)]
mod tests {
    use crate::eval_to_string;

    #[test]
    fn string_length_counts_characters_not_bytes() {
        assert_eq!(eval_to_string(r#""héllo".length();"#), "5");
    }

    #[test]
    fn string_split_and_replace() {
        assert_eq!(eval_to_string(r#""a,b,c".split(",").length();"#), "3");
        assert_eq!(eval_to_string(r#""hello".replace("l", "L");"#), "heLLo");
    }

    #[test]
    fn string_to_bool_accepts_yes_no_family() {
        assert_eq!(eval_to_string(r#""yes".toBool();"#), "true");
        assert_eq!(eval_to_string(r#""off".toBool();"#), "false");
        assert!(eval_to_string(r#""maybe".toBool();"#).starts_with("error"));
    }

    #[test]
    fn string_format_substitutes_named_placeholders() {
        assert_eq!(eval_to_string(r#""{name} is {age}".format("name", "Jo", "age", 5);"#), "Jo is 5");
    }

    #[test]
    fn string_format_from_single_dict_argument() {
        assert_eq!(eval_to_string(r#""{name}!".format({name: "hi"});"#), "hi!");
    }

    #[test]
    fn string_format_leaves_malformed_braces_untouched() {
        assert_eq!(eval_to_string(r#""{oops".format();"#), "{oops");
    }

    #[test]
    fn array_map_filter_reduce() {
        assert_eq!(
            eval_to_string("func double(x) return x * 2; end [1,2,3].map(double).join(\",\");"),
            "2,4,6"
        );
        assert_eq!(
            eval_to_string("func over2(x) return x > 2; end [1,2,3,4].filter(over2).join(\",\");"),
            "3,4"
        );
        assert_eq!(
            eval_to_string("func sum(a, b) return a + b; end [1,2,3].reduce(sum, 0);"),
            "6"
        );
    }

    #[test]
    fn array_negative_index_helpers() {
        assert_eq!(eval_to_string("[1,2,3,4].slice(-2).join(\",\");"), "3,4");
        assert_eq!(eval_to_string("[1,2,3].indexOf(3);"), "2");
        assert_eq!(eval_to_string("[1,2,3].includes(5);"), "false");
    }

    #[test]
    fn array_sort_default_is_lexicographic_by_display_string() {
        assert_eq!(eval_to_string("[10, 2, 1].sort().join(\",\");"), "1,10,2");
    }

    #[test]
    fn array_sort_with_custom_comparator() {
        assert_eq!(
            eval_to_string("func byValue(a, b) return a - b; end [10, 2, 1].sort(byValue).join(\",\");"),
            "1,2,10"
        );
    }

    #[test]
    fn array_concat_flattens_one_level() {
        assert_eq!(eval_to_string("[1,2].concat([3,4], 5).join(\",\");"), "1,2,3,4,5");
    }
}
