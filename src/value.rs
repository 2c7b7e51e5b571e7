//! The runtime value model: the tagged union every expression evaluates to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::FuncDecl;
use crate::environment::EnvRef;
use crate::error::LapisResult;
use crate::source_map::Span;

/// How many arguments a callable accepts. `Variadic(n)` means "at least
/// `n`, with the remainder collected into the variadic parameter."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == *n,
            Arity::Variadic(min) => count >= *min,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Arity::Fixed(n) => n.to_string(),
            Arity::Variadic(min) => format!("at least {min}"),
        }
    }
}

/// A key usable inside a dictionary literal. Only hashable runtime values
/// may act as keys, mirroring the host language's own dict-key rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Null,
    Bool(bool),
    Int(i64),
    /// Float keys are keyed on their bit pattern so NaN/±0 behave
    /// consistently with `Hash`; equality for display still uses the value.
    FloatBits(u64),
    Str(Rc<str>),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<DictKey> {
        match value {
            Value::Null => Some(DictKey::Null),
            Value::Bool(b) => Some(DictKey::Bool(*b)),
            Value::Int(i) => Some(DictKey::Int(*i)),
            Value::Float(f) => Some(DictKey::FloatBits(f.to_bits())),
            Value::Str(s) => Some(DictKey::Str(Rc::clone(s))),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Null => Value::Null,
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(i) => Value::Int(*i),
            DictKey::FloatBits(bits) => Value::Float(f64::from_bits(*bits)),
            DictKey::Str(s) => Value::Str(Rc::clone(s)),
        }
    }
}

pub type Dict = IndexMap<DictKey, Value>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Dict>>),
    Callable(Rc<dyn Callable>),
    Class(Rc<LapisClass>),
    Instance(Rc<RefCell<Instance>>),
    /// A host built-in namespace (`Console`, `Math`, `File`): a fixed set of
    /// members resolved through ordinary member access.
    Module(Rc<HashMap<String, Value>>),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.borrow().is_empty(),
            Value::Dict(d) => !d.borrow().is_empty(),
            Value::Callable(_) | Value::Class(_) | Value::Instance(_) | Value::Module(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dictionary",
            Value::Callable(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Module(_) => "module",
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&to_display_string(self))
    }
}

/// Canonical `to_string` rendering shared by `+` concatenation, template
/// literals, `Console.print`, and `String.format`.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(s) => s.to_string(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.borrow().iter().map(to_display_string).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Dict(entries) => {
            let rendered: Vec<String> = entries
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", to_display_string(&k.to_value()), to_display_string(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Callable(c) => format!("<function {}>", c.name()),
        Value::Class(c) => format!("<class {}>", c.name),
        Value::Instance(inst) => format!("<instance of {}>", inst.borrow().class.name),
        Value::Module(_) => "<module>".to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Structural equality per the comparison rules: null only equals null,
/// numerics cross-compare, arrays/dicts compare element-wise, everything
/// else compares by reference identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (x, y) if x.is_number() && y.is_number() => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| values_equal(l, r))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).map(|rv| values_equal(v, rv)).unwrap_or(false))
        }
        (Value::Callable(x), Value::Callable(y)) => Rc::ptr_eq(x, y),
        (Value::Class(x), Value::Class(y)) => Rc::ptr_eq(x, y),
        (Value::Instance(x), Value::Instance(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// A callable value: user-defined functions/methods, bound methods, classes
/// (callable as constructors), and host builtins all implement this.
pub trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> Arity;
    fn call(&self, interp: &mut crate::interpreter::Interpreter, args: Vec<Value>, span: Span) -> LapisResult<Value>;
}

/// A user-defined function or method: parameters, body, and the environment
/// captured at declaration time.
pub struct LapisFunction {
    pub decl: FuncDecl,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl LapisFunction {
    pub fn arity_of(decl: &FuncDecl) -> Arity {
        let variadic_count = decl.params.iter().filter(|p| p.variadic).count();
        if variadic_count > 0 {
            Arity::Variadic(decl.params.len() - variadic_count)
        } else {
            Arity::Fixed(decl.params.len())
        }
    }
}

impl Callable for LapisFunction {
    fn name(&self) -> &str {
        &self.decl.name
    }

    fn arity(&self) -> Arity {
        Self::arity_of(&self.decl)
    }

    fn call(&self, interp: &mut crate::interpreter::Interpreter, args: Vec<Value>, span: Span) -> LapisResult<Value> {
        interp.call_user_function(&self.decl, &self.closure, args, span, self.is_initializer, None)
    }
}

/// A function bound to a `this` instance; invoking it binds `this` and runs
/// the underlying function body exactly once.
pub struct BoundMethod {
    pub instance: Rc<RefCell<Instance>>,
    pub method: Rc<LapisFunction>,
}

impl Callable for BoundMethod {
    fn name(&self) -> &str {
        &self.method.decl.name
    }

    fn arity(&self) -> Arity {
        self.method.arity()
    }

    fn call(&self, interp: &mut crate::interpreter::Interpreter, args: Vec<Value>, span: Span) -> LapisResult<Value> {
        interp.call_user_function(
            &self.method.decl,
            &self.method.closure,
            args,
            span,
            self.method.is_initializer,
            Some(Rc::clone(&self.instance)),
        )
    }
}

/// A host-implemented function: built-ins (`Console.print`, `Math.sqrt`,
/// array/string/number methods) are all instances of this.
pub struct NativeFunction {
    pub name: String,
    pub arity: Arity,
    pub func: Box<dyn Fn(&mut crate::interpreter::Interpreter, Vec<Value>, Span) -> LapisResult<Value>>,
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn call(&self, interp: &mut crate::interpreter::Interpreter, args: Vec<Value>, span: Span) -> LapisResult<Value> {
        (self.func)(interp, args, span)
    }
}

pub struct LapisClass {
    pub name: String,
    pub methods: HashMap<String, Rc<LapisFunction>>,
}

impl LapisClass {
    pub fn find_method(&self, name: &str) -> Option<Rc<LapisFunction>> {
        self.methods.get(name).cloned()
    }

    pub fn arity(&self) -> Arity {
        self.find_method("init").map(|init| init.arity()).unwrap_or(Arity::Fixed(0))
    }
}

pub struct Instance {
    pub class: Rc<LapisClass>,
    pub fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<LapisClass>) -> Self {
        Self { class, fields: HashMap::new() }
    }
}
