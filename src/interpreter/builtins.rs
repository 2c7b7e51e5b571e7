//! Host-implemented `Console`, `Math`, and `File` modules, defined into
//! every fresh global environment (the main program's and every imported
//! module's).

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use super::native;
use crate::ast::Access;
use crate::environment::EnvRef;
use crate::error;
use crate::value::{to_display_string, Arity, Value};

pub fn define_builtins(env: &EnvRef) {
    env.borrow_mut().define("Console", console_module(), Access::Public);
    env.borrow_mut().define("Math", math_module(), Access::Public);
    env.borrow_mut().define("File", file_module(), Access::Public);
}

fn module(members: Vec<(&str, Value)>) -> Value {
    let map: HashMap<String, Value> = members.into_iter().map(|(name, value)| (name.to_string(), value)).collect();
    Value::Module(Rc::new(map))
}

fn console_module() -> Value {
    module(vec![
        ("print", native("print", Arity::Variadic(0), |_, args, _| {
            let line = args.iter().map(to_display_string).collect::<Vec<_>>().join(" ");
            println!("{line}");
            Ok(Value::Null)
        })),
        ("error", native("error", Arity::Fixed(1), |_, args, span| {
            Err(error::runtime(span, to_display_string(&args[0])))
        })),
        ("input", native("input", Arity::Variadic(0), |_, args, _| {
            if !args.is_empty() {
                print!("{}", to_display_string(&args[0]));
                let _ = std::io::stdout().flush();
            }
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => Ok(Value::Null),
                Ok(_) => Ok(Value::str(line.trim_end_matches(['\n', '\r']).to_string())),
                Err(_) => Ok(Value::Null),
            }
        })),
        ("number", native("number", Arity::Variadic(0), |_, args, span| {
            if !args.is_empty() {
                print!("{}", to_display_string(&args[0]));
                let _ = std::io::stdout().flush();
            }
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => Ok(Value::Null),
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.contains('.') {
                        trimmed.parse::<f64>().map(Value::Float).map_err(|_| error::runtime(span, format!("invalid number input: '{trimmed}'")))
                    } else {
                        trimmed.parse::<i64>().map(Value::Int).map_err(|_| error::runtime(span, format!("invalid number input: '{trimmed}'")))
                    }
                }
                Err(_) => Ok(Value::Null),
            }
        })),
    ])
}

fn math_module() -> Value {
    module(vec![
        ("sqrt", native("sqrt", Arity::Fixed(1), |_, args, span| {
            let x = number_arg(&args[0], span, "Math.sqrt() requires a number")?;
            if x < 0.0 {
                return Err(error::runtime(span, "Math.sqrt() argument must be non-negative"));
            }
            Ok(Value::Float(x.sqrt()))
        })),
        ("abs", native("abs", Arity::Fixed(1), |_, args, span| match &args[0] {
            Value::Int(i) => Ok(Value::Int(i.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            _ => Err(error::runtime(span, "Math.abs() requires a number")),
        })),
        ("floor", native("floor", Arity::Fixed(1), |_, args, span| {
            Ok(Value::Int(number_arg(&args[0], span, "Math.floor() requires a number")?.floor() as i64))
        })),
        ("ceil", native("ceil", Arity::Fixed(1), |_, args, span| {
            Ok(Value::Int(number_arg(&args[0], span, "Math.ceil() requires a number")?.ceil() as i64))
        })),
    ])
}

fn file_module() -> Value {
    module(vec![
        ("read", native("read", Arity::Fixed(1), |_, args, span| {
            let path = string_arg(&args[0], span, "File.read() requires a string filename")?;
            std::fs::read_to_string(&path).map(Value::str).map_err(|e| error::runtime(span, format!("error reading file '{path}': {e}")))
        })),
        ("write", native("write", Arity::Fixed(2), |_, args, span| {
            let path = string_arg(&args[0], span, "File.write() requires a string filename")?;
            std::fs::write(&path, to_display_string(&args[1])).map(|_| Value::Bool(true)).map_err(|e| error::runtime(span, format!("error writing file '{path}': {e}")))
        })),
        ("append", native("append", Arity::Fixed(2), |_, args, span| {
            let path = string_arg(&args[0], span, "File.append() requires a string filename")?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut f| f.write_all(to_display_string(&args[1]).as_bytes()))
                .map(|_| Value::Bool(true))
                .map_err(|e| error::runtime(span, format!("error appending to file '{path}': {e}")))
        })),
        ("exists", native("exists", Arity::Fixed(1), |_, args, span| {
            let path = string_arg(&args[0], span, "File.exists() requires a string filename")?;
            Ok(Value::Bool(std::path::Path::new(&path).exists()))
        })),
        ("delete", native("delete", Arity::Fixed(1), |_, args, span| {
            let path = string_arg(&args[0], span, "File.delete() requires a string filename")?;
            std::fs::remove_file(&path).map(|_| Value::Bool(true)).map_err(|e| error::runtime(span, format!("error deleting file '{path}': {e}")))
        })),
        ("list", native("list", Arity::Variadic(0), |_, args, span| {
            let dir = if args.is_empty() { ".".to_string() } else { string_arg(&args[0], span, "File.list() requires a string directory path")? };
            let entries = std::fs::read_dir(&dir).map_err(|e| error::runtime(span, format!("error listing directory '{dir}': {e}")))?;
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| error::runtime(span, format!("error listing directory '{dir}': {e}")))?;
                names.push(Value::str(entry.file_name().to_string_lossy().to_string()));
            }
            Ok(Value::array(names))
        })),
    ])
}

fn number_arg(value: &Value, span: crate::source_map::Span, message: &str) -> error::LapisResult<f64> {
    value.as_f64().ok_or_else(|| error::runtime(span, message))
}

fn string_arg(value: &Value, span: crate::source_map::Span, message: &str) -> error::LapisResult<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        _ => Err(error::runtime(span, message)),
    }
}

#[cfg(test)]
mod tests {
    use crate::eval_to_string;

    #[test]
    fn math_sqrt_abs_floor_ceil() {
        assert_eq!(eval_to_string("Math.sqrt(9);"), "3.0");
        assert_eq!(eval_to_string("Math.abs(-4);"), "4");
        assert_eq!(eval_to_string("Math.floor(2.9);"), "2");
        assert_eq!(eval_to_string("Math.ceil(2.1);"), "3");
    }

    #[test]
    fn math_sqrt_of_negative_is_an_error() {
        assert!(eval_to_string("Math.sqrt(-1);").starts_with("error"));
    }

    #[test]
    fn console_error_raises_a_catchable_runtime_error() {
        let src = r#"
            var caught = false;
            try
                Console.error("boom");
            catch (e)
                caught = true;
            end
            caught;
        "#;
        assert_eq!(eval_to_string(src), "true");
    }

    #[test]
    fn file_write_read_exists_delete_round_trip() {
        let path = std::env::temp_dir().join(format!("lapis_builtins_test_{}.txt", std::process::id()));
        let src = format!(
            r#"
            var p = "{}";
            File.write(p, "hello");
            var existed = File.exists(p);
            var content = File.read(p);
            File.delete(p);
            [existed, content, File.exists(p)];
            "#,
            path.to_string_lossy()
        );
        assert_eq!(eval_to_string(&src), "[true, hello, false]");
    }

    #[test]
    fn missing_builtin_member_reports_no_property() {
        assert!(eval_to_string("Console.bogus;").starts_with("error [LAP3005]"));
    }
}
