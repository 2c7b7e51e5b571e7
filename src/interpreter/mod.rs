//! Tree-walking evaluator: statement execution and expression evaluation
//! over the spanned AST, threaded through the lexical environment chain.

mod builtins;
mod methods;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use crate::ast::{
    Access, BinaryOp, CatchClause, Expr, FuncDecl, Program, Stmt, TemplatePartNode, UnaryOp,
};
use crate::environment::{EnvRef, Environment};
use crate::error::{self, LapisResult};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::source_map::{Span, SourceMap};
use crate::value::{
    to_display_string, values_equal, BoundMethod, Callable, DictKey, Instance, LapisClass,
    LapisFunction, NativeFunction, Value,
};

/// A non-local control transfer bubbling up out of `exec_block`. `None`
/// means "ran to completion, keep going".
#[derive(Debug, Clone)]
pub enum Signal {
    Return(Value, Span),
    Break(Span),
    Continue(Span),
}

pub struct Interpreter {
    pub globals: EnvRef,
    pub source_map: SourceMap,
    module_globals: HashMap<PathBuf, EnvRef>,
    base_dir: PathBuf,
}

impl Interpreter {
    pub fn new(source_map: SourceMap) -> Self {
        let globals = Environment::new_root();
        builtins::define_builtins(&globals);
        Self {
            globals,
            source_map,
            module_globals: HashMap::new(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn run(&mut self, program: &Program) -> LapisResult<()> {
        let env = Rc::clone(&self.globals);
        self.exec_program(program, &env)
    }

    /// Run every statement but the last, then evaluate the last one as an
    /// expression if it is one. Used by `eval_to_string` so a script's
    /// trailing expression can stand in for an explicit `return`.
    pub fn run_and_eval_last(&mut self, program: &Program) -> LapisResult<Value> {
        let env = Rc::clone(&self.globals);
        let Some((last, rest)) = program.split_last() else {
            return Ok(Value::Null);
        };
        if let Some(signal) = self.exec_block(rest, &env)? {
            return match signal {
                Signal::Return(_, span) => Err(error::control_flow_misuse(span, "return")),
                Signal::Break(span) => Err(error::control_flow_misuse(span, "break")),
                Signal::Continue(span) => Err(error::control_flow_misuse(span, "continue")),
            };
        }
        match last {
            Stmt::ExprStmt(expr) => self.eval_expr(expr, &env),
            other => {
                self.exec_stmt(other, &env)?;
                Ok(Value::Null)
            }
        }
    }

    fn exec_program(&mut self, program: &Program, env: &EnvRef) -> LapisResult<()> {
        match self.exec_block(program, env)? {
            Some(Signal::Return(_, span)) => Err(error::control_flow_misuse(span, "return")),
            Some(Signal::Break(span)) => Err(error::control_flow_misuse(span, "break")),
            Some(Signal::Continue(span)) => Err(error::control_flow_misuse(span, "continue")),
            None => Ok(()),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &EnvRef) -> LapisResult<Option<Signal>> {
        for stmt in stmts {
            if let Some(signal) = self.exec_stmt(stmt, env)? {
                return Ok(Some(signal));
            }
        }
        Ok(None)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> LapisResult<Option<Signal>> {
        match stmt {
            Stmt::VarDecl { access, name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                env.borrow_mut().define(name.clone(), value, *access);
                Ok(None)
            }
            Stmt::FuncDecl { access, decl } => {
                let function = LapisFunction {
                    decl: decl.clone(),
                    closure: Rc::clone(env),
                    is_initializer: false,
                };
                env.borrow_mut().define(decl.name.clone(), Value::Callable(Rc::new(function)), *access);
                Ok(None)
            }
            Stmt::ClassDecl { access, name, methods, .. } => {
                let mut method_map = HashMap::new();
                for decl in methods {
                    let function = LapisFunction {
                        decl: decl.clone(),
                        closure: Rc::clone(env),
                        is_initializer: decl.name == "init",
                    };
                    method_map.insert(decl.name.clone(), Rc::new(function));
                }
                let class = LapisClass { name: name.clone(), methods: method_map };
                env.borrow_mut().define(name.clone(), Value::Class(Rc::new(class)), *access);
                Ok(None)
            }
            Stmt::Package { path, use_names, span } => {
                self.exec_package(path, use_names, *span, env)?;
                Ok(None)
            }
            Stmt::ExprStmt(expr) => {
                self.eval_expr(expr, env)?;
                Ok(None)
            }
            Stmt::If { branches, else_branch, .. } => {
                for (condition, body) in branches {
                    if self.eval_expr(condition, env)?.is_truthy() {
                        let branch_env = Environment::new_child(env);
                        return self.exec_block(body, &branch_env);
                    }
                }
                match else_branch {
                    Some(body) => {
                        let branch_env = Environment::new_child(env);
                        self.exec_block(body, &branch_env)
                    }
                    None => Ok(None),
                }
            }
            Stmt::While { condition, body, .. } => {
                while self.eval_expr(condition, env)?.is_truthy() {
                    let body_env = Environment::new_child(env);
                    match self.exec_block(body, &body_env)? {
                        Some(Signal::Break(_)) => break,
                        Some(Signal::Continue(_)) => continue,
                        signal @ Some(Signal::Return(..)) => return Ok(signal),
                        None => {}
                    }
                }
                Ok(None)
            }
            Stmt::For { var, iterable, body, span } => {
                let iterable_value = self.eval_expr(iterable, env)?;
                let items = match &iterable_value {
                    Value::Array(items) => items.borrow().clone(),
                    other => return Err(error::runtime(*span, format!("for-in requires an array, found {}", other.type_name()))),
                };
                for item in items {
                    let body_env = Environment::new_child(env);
                    body_env.borrow_mut().define(var.clone(), item, Access::Private);
                    match self.exec_block(body, &body_env)? {
                        Some(Signal::Break(_)) => break,
                        Some(Signal::Continue(_)) => continue,
                        signal @ Some(Signal::Return(..)) => return Ok(signal),
                        None => {}
                    }
                }
                Ok(None)
            }
            Stmt::Return(expr, span) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Ok(Some(Signal::Return(value, *span)))
            }
            Stmt::Break(span) => Ok(Some(Signal::Break(*span))),
            Stmt::Continue(span) => Ok(Some(Signal::Continue(*span))),
            Stmt::Try { body, catches, finally, .. } => self.exec_try(body, catches, finally, env),
            Stmt::Switch { discriminant, cases, default, .. } => {
                let disc = self.eval_expr(discriminant, env)?;
                let mut matched: Option<&Vec<Stmt>> = None;
                'outer: for case in cases {
                    for value_expr in &case.values {
                        let candidate = self.eval_expr(value_expr, env)?;
                        if values_equal(&disc, &candidate) {
                            matched = Some(&case.body);
                            break 'outer;
                        }
                    }
                }
                let body = matched.or(default.as_ref());
                match body {
                    Some(body) => {
                        let case_env = Environment::new_child(env);
                        match self.exec_block(body, &case_env)? {
                            Some(Signal::Break(_)) => Ok(None),
                            other => Ok(other),
                        }
                    }
                    None => Ok(None),
                }
            }
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        catches: &[CatchClause],
        finally: &Option<Vec<Stmt>>,
        env: &EnvRef,
    ) -> LapisResult<Option<Signal>> {
        let try_env = Environment::new_child(env);
        let outcome = match self.exec_block(body, &try_env) {
            Ok(signal) => Ok(signal),
            Err(e) if e.is_catchable() => self.run_catch(catches, &e, env),
            Err(e) => Err(e),
        };

        if let Some(finally_body) = finally {
            let finally_env = Environment::new_child(env);
            match self.exec_block(finally_body, &finally_env) {
                Ok(Some(signal)) => return Ok(Some(signal)),
                Ok(None) => {}
                Err(finally_err) => return Err(finally_err),
            }
        }

        outcome
    }

    fn run_catch(
        &mut self,
        catches: &[CatchClause],
        err: &crate::error::LapisError,
        env: &EnvRef,
    ) -> LapisResult<Option<Signal>> {
        match catches.first() {
            Some(clause) => {
                let catch_env = Environment::new_child(env);
                if let Some(binding) = &clause.binding {
                    catch_env.borrow_mut().define(binding.clone(), make_error_value(err), Access::Private);
                }
                self.exec_block(&clause.body, &catch_env)
            }
            None => Err(err.clone()),
        }
    }

    // --- imports ------------------------------------------------------

    fn resolve_import_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_dir.join(candidate)
        };
        normalize_path(&joined)
    }

    fn exec_package(
        &mut self,
        path: &str,
        use_names: &Option<Vec<String>>,
        span: Span,
        env: &EnvRef,
    ) -> LapisResult<()> {
        let resolved = self.resolve_import_path(path);

        let globals = if let Some(cached) = self.module_globals.get(&resolved) {
            Rc::clone(cached)
        } else {
            log::trace!("importing package '{path}'");
            let module_globals = Environment::new_root();
            builtins::define_builtins(&module_globals);
            // Insert before running the body so a circular import re-enters
            // this same (possibly incomplete) environment instead of
            // recursing forever.
            self.module_globals.insert(resolved.clone(), Rc::clone(&module_globals));

            let content = std::fs::read_to_string(&resolved)
                .map_err(|e| error::import_error(span, format!("cannot import '{path}': {e}")))?;
            self.source_map.add_file(&resolved, content.clone());

            let tokens = Lexer::new(&mut self.source_map, &resolved.to_string_lossy(), &content)
                .tokenize()
                .map_err(|e| error::import_error(span, format!("error importing '{path}': {}", e.diagnostic.message)))?;
            let program = Parser::new_default(tokens).parse().map_err(|errs| {
                let message = errs.first().map(|e| e.diagnostic.message.clone()).unwrap_or_default();
                error::import_error(span, format!("error importing '{path}': {message}"))
            })?;

            self.exec_program(&program, &module_globals)
                .map_err(|e| error::import_error(span, format!("error importing '{path}': {}", e.diagnostic.message)))?;
            log::debug!("finished importing '{path}'");
            module_globals
        };

        match use_names {
            None => {
                for (name, value) in globals.borrow().get_all_public() {
                    env.borrow_mut().define(name, value, Access::Private);
                }
            }
            Some(names) => {
                for name in names {
                    match globals.borrow().get(name, span, true) {
                        Ok(value) => env.borrow_mut().define(name.clone(), value, Access::Private),
                        Err(e) if e.kind == crate::error::Kind::Access => {
                            return Err(error::import_error(span, format!("cannot import private symbol '{name}' from '{path}'")));
                        }
                        Err(_) => {
                            return Err(error::import_error(span, format!("symbol '{name}' not found in '{path}'")));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // --- expressions ----------------------------------------------------

    fn eval_expr(&mut self, expr: &Expr, env: &EnvRef) -> LapisResult<Value> {
        match expr {
            Expr::Number(crate::token::Number::Int(i), _) => Ok(Value::Int(*i)),
            Expr::Number(crate::token::Number::Float(f), _) => Ok(Value::Float(*f)),
            Expr::Str(s, _) => Ok(Value::str(s.clone())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::Template(parts, span) => self.eval_template(parts, *span, env),
            Expr::Identifier(name, span) => env.borrow().get(name, *span, false),
            Expr::This(span) => env.borrow().get("this", *span, false),
            Expr::Array(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env)?);
                }
                Ok(Value::array(values))
            }
            Expr::Dict(entries, span) => {
                let mut dict = crate::value::Dict::new();
                for (key_expr, value_expr) in entries {
                    let key_value = self.eval_expr(key_expr, env)?;
                    let key = DictKey::from_value(&key_value)
                        .ok_or_else(|| error::runtime(*span, format!("{} is not a valid dictionary key", key_value.type_name())))?;
                    let value = self.eval_expr(value_expr, env)?;
                    dict.insert(key, value);
                }
                Ok(Value::dict(dict))
            }
            Expr::Unary { op, operand, span } => self.eval_unary(*op, operand, *span, env),
            Expr::Postfix { op, target, span } => self.eval_postfix(*op, target, *span, env),
            Expr::Binary { op, left, right, span } => self.eval_binary(*op, left, right, *span, env),
            Expr::Assign { target, value, span } => self.eval_assign(target, value, *span, env),
            Expr::Call { callee, args, span } => self.eval_call(callee, args, *span, env),
            Expr::Member { object, name, span } => {
                let object_value = self.eval_expr(object, env)?;
                self.get_member(object_value, name, *span)
            }
            Expr::Index { object, index, span } => {
                let object_value = self.eval_expr(object, env)?;
                let index_value = self.eval_expr(index, env)?;
                self.get_index(object_value, index_value, *span)
            }
        }
    }

    fn eval_template(&mut self, parts: &[TemplatePartNode], span: Span, env: &EnvRef) -> LapisResult<Value> {
        let mut result = String::new();
        for part in parts {
            match part {
                TemplatePartNode::Text(text) => result.push_str(text),
                TemplatePartNode::Expr(source, expr_span) => {
                    let mut scratch = SourceMap::new();
                    let tokens = Lexer::new(&mut scratch, "<template>", source)
                        .tokenize()
                        .map_err(|_| error::runtime(*expr_span, "invalid expression inside template literal"))?;
                    let expr = Parser::new_default(tokens)
                        .parse_standalone_expression()
                        .map_err(|_| error::runtime(*expr_span, "invalid expression inside template literal"))?;
                    let value = self.eval_expr(&expr, env)?;
                    result.push_str(&to_display_string(&value));
                }
            }
        }
        let _ = span;
        Ok(Value::str(result))
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span, env: &EnvRef) -> LapisResult<Value> {
        let value = self.eval_expr(operand, env)?;
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
            UnaryOp::Neg => match value {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(error::type_mismatch_binary(span, operand.span(), operand.span(), "-", other.type_name(), other.type_name())),
            },
        }
    }

    fn eval_postfix(&mut self, op: crate::ast::PostfixOp, target: &Expr, span: Span, env: &EnvRef) -> LapisResult<Value> {
        let name = match target {
            Expr::Identifier(name, _) => name,
            _ => return Err(error::invalid_assignment_target(span)),
        };
        let current = env.borrow().get(name, span, false)?;
        let delta = match op {
            crate::ast::PostfixOp::Inc => 1.0,
            crate::ast::PostfixOp::Dec => -1.0,
        };
        let updated = match &current {
            Value::Int(i) => Value::Int(i + delta as i64),
            Value::Float(f) => Value::Float(f + delta),
            other => return Err(error::runtime(span, format!("postfix operators require a number, found {}", other.type_name()))),
        };
        env.borrow_mut().assign(name, updated, span, false)?;
        Ok(current)
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span, env: &EnvRef) -> LapisResult<Value> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let left_value = self.eval_expr(left, env)?;
            return match op {
                BinaryOp::And if !left_value.is_truthy() => Ok(left_value),
                BinaryOp::Or if left_value.is_truthy() => Ok(left_value),
                _ => self.eval_expr(right, env),
            };
        }

        let left_value = self.eval_expr(left, env)?;
        let right_value = self.eval_expr(right, env)?;
        let left_span = left.span();
        let right_span = right.span();

        match op {
            BinaryOp::Add => self.eval_add(&left_value, &right_value, span, left_span, right_span),
            BinaryOp::Sub => numeric_binary(&left_value, &right_value, span, left_span, right_span, "-", |a, b| Ok(a - b)),
            BinaryOp::Mul => numeric_binary(&left_value, &right_value, span, left_span, right_span, "*", |a, b| Ok(a * b)),
            BinaryOp::Div => numeric_binary(&left_value, &right_value, span, left_span, right_span, "/", |a, b| {
                if b == 0.0 {
                    Err(error::division_by_zero(span))
                } else {
                    Ok(a / b)
                }
            }),
            BinaryOp::Mod => numeric_binary(&left_value, &right_value, span, left_span, right_span, "%", |a, b| {
                if b == 0.0 {
                    Err(error::division_by_zero(span))
                } else {
                    Ok(((a % b) + b) % b)
                }
            }),
            BinaryOp::Pow => numeric_binary(&left_value, &right_value, span, left_span, right_span, "**", |a, b| Ok(a.powf(b))),
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left_value, &right_value))),
            BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&left_value, &right_value))),
            BinaryOp::Lt => comparison(&left_value, &right_value, span, left_span, right_span, "<", |a, b| a < b),
            BinaryOp::LtEq => comparison(&left_value, &right_value, span, left_span, right_span, "<=", |a, b| a <= b),
            BinaryOp::Gt => comparison(&left_value, &right_value, span, left_span, right_span, ">", |a, b| a > b),
            BinaryOp::GtEq => comparison(&left_value, &right_value, span, left_span, right_span, ">=", |a, b| a >= b),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_add(&self, left: &Value, right: &Value, span: Span, left_span: Span, right_span: Span) -> LapisResult<Value> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (left, right) if left.is_number() && right.is_number() => {
                Ok(Value::Float(left.as_f64().unwrap() + right.as_f64().unwrap()))
            }
            (left, right) if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) => {
                Ok(Value::str(format!("{}{}", to_display_string(left), to_display_string(right))))
            }
            (left, right) => Err(error::type_mismatch_binary(span, left_span, right_span, "+", left.type_name(), right.type_name())),
        }
    }

    fn eval_assign(&mut self, target: &Expr, value_expr: &Expr, span: Span, env: &EnvRef) -> LapisResult<Value> {
        let value = self.eval_expr(value_expr, env)?;
        match target {
            Expr::Identifier(name, _) => {
                env.borrow_mut().assign(name, value.clone(), span, false)?;
                Ok(value)
            }
            Expr::Member { object, name, span: member_span } => {
                let object_value = self.eval_expr(object, env)?;
                match &object_value {
                    Value::Instance(instance) => {
                        instance.borrow_mut().fields.insert(name.clone(), value.clone());
                        Ok(value)
                    }
                    other => Err(error::no_property(*member_span, other.type_name(), name)),
                }
            }
            Expr::Index { object, index, span: index_span } => {
                let object_value = self.eval_expr(object, env)?;
                let index_value = self.eval_expr(index, env)?;
                self.set_index(object_value, index_value, value.clone(), *index_span)?;
                Ok(value)
            }
            _ => Err(error::invalid_assignment_target(span)),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: Span, env: &EnvRef) -> LapisResult<Value> {
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg, env)?);
        }

        let callee_value = self.eval_expr(callee, env)?;
        self.invoke(callee_value, arg_values, span)
    }

    pub fn invoke(&mut self, callee: Value, args: Vec<Value>, span: Span) -> LapisResult<Value> {
        match callee {
            Value::Callable(callable) => {
                let arity = callable.arity();
                if !arity.accepts(args.len()) {
                    return Err(error::wrong_arity(span, arity.describe(), args.len()));
                }
                callable.call(self, args, span)
            }
            Value::Class(class) => {
                let arity = class.arity();
                if !arity.accepts(args.len()) {
                    return Err(error::wrong_arity(span, arity.describe(), args.len()));
                }
                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));
                if let Some(init) = class.find_method("init") {
                    let bound = BoundMethod { instance: Rc::clone(&instance), method: init };
                    bound.call(self, args, span)?;
                }
                Ok(Value::Instance(instance))
            }
            other => Err(error::cannot_call(span, other.type_name())),
        }
    }

    /// Shared call path for user functions, methods, and `init`: binds
    /// parameters, optionally binds `this`, executes the body, and unwraps
    /// the resulting signal into a return value.
    pub fn call_user_function(
        &mut self,
        decl: &FuncDecl,
        closure: &EnvRef,
        args: Vec<Value>,
        span: Span,
        is_initializer: bool,
        this: Option<Rc<RefCell<Instance>>>,
    ) -> LapisResult<Value> {
        let call_env = Environment::new_child(closure);
        if let Some(instance) = &this {
            call_env.borrow_mut().define("this", Value::Instance(Rc::clone(instance)), Access::Private);
        }

        let mut args = args.into_iter();
        for param in &decl.params {
            if param.variadic {
                let rest: Vec<Value> = args.by_ref().collect();
                call_env.borrow_mut().define(param.name.clone(), Value::array(rest), Access::Private);
            } else {
                let value = args.next().unwrap_or(Value::Null);
                call_env.borrow_mut().define(param.name.clone(), value, Access::Private);
            }
        }

        log::trace!("calling function '{}'", decl.name);
        let signal = self.exec_block(&decl.body, &call_env)?;
        log::trace!("returned from function '{}'", decl.name);

        let this_value = || this.clone().map(Value::Instance).unwrap_or(Value::Null);
        match signal {
            Some(Signal::Return(value, _)) => Ok(if is_initializer { this_value() } else { value }),
            Some(Signal::Break(span)) => Err(error::control_flow_misuse(span, "break")),
            Some(Signal::Continue(span)) => Err(error::control_flow_misuse(span, "continue")),
            None => Ok(this_value()),
        }
    }

    // --- member / index access ------------------------------------------

    pub fn get_member(&mut self, object: Value, name: &str, span: Span) -> LapisResult<Value> {
        match &object {
            Value::Instance(instance) => {
                let field = instance.borrow().fields.get(name).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }
                let method = instance.borrow().class.find_method(name);
                match method {
                    Some(method) => Ok(Value::Callable(Rc::new(BoundMethod { instance: Rc::clone(instance), method }))),
                    None => Err(error::no_property(span, "instance", name)),
                }
            }
            Value::Module(members) => members.get(name).cloned().ok_or_else(|| {
                log::warn!("builtin module has no member '{name}'");
                error::no_property(span, "module", name)
            }),
            Value::Str(_) => methods::string_method(object, name, span),
            Value::Int(_) | Value::Float(_) => methods::number_method(object, name, span),
            Value::Bool(_) => methods::boolean_method(object, name, span),
            Value::Array(_) => methods::array_method(object, name, span),
            other => Err(error::no_property(span, other.type_name(), name)),
        }
    }

    fn get_index(&mut self, object: Value, index: Value, span: Span) -> LapisResult<Value> {
        match &object {
            Value::Array(items) => {
                let items = items.borrow();
                let i = array_index(&index, items.len(), span)?;
                items.get(i).cloned().ok_or_else(|| error::index_out_of_bounds(span, index.as_f64().unwrap_or(0.0) as i64, items.len()))
            }
            Value::Dict(entries) => {
                let key = DictKey::from_value(&index)
                    .ok_or_else(|| error::runtime(span, format!("{} is not a valid dictionary key", index.type_name())))?;
                Ok(entries.borrow().get(&key).cloned().unwrap_or(Value::Null))
            }
            Value::Str(s) => {
                let i = array_index(&index, s.chars().count(), span)?;
                s.chars().nth(i).map(|c| Value::str(c.to_string())).ok_or_else(|| {
                    error::index_out_of_bounds(span, index.as_f64().unwrap_or(0.0) as i64, s.chars().count())
                })
            }
            other => Err(error::runtime(span, format!("cannot index into {}", other.type_name()))),
        }
    }

    fn set_index(&mut self, object: Value, index: Value, value: Value, span: Span) -> LapisResult<()> {
        match &object {
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                let i = array_index(&index, items.len(), span)?;
                if i >= items.len() {
                    return Err(error::index_out_of_bounds(span, index.as_f64().unwrap_or(0.0) as i64, items.len()));
                }
                items[i] = value;
                Ok(())
            }
            Value::Dict(entries) => {
                let key = DictKey::from_value(&index)
                    .ok_or_else(|| error::runtime(span, format!("{} is not a valid dictionary key", index.type_name())))?;
                entries.borrow_mut().insert(key, value);
                Ok(())
            }
            other => Err(error::runtime(span, format!("cannot assign into {}", other.type_name()))),
        }
    }
}

fn array_index(index: &Value, len: usize, span: Span) -> LapisResult<usize> {
    let i = match index {
        Value::Int(i) => *i,
        other => return Err(error::runtime(span, format!("index must be a number, found {}", other.type_name()))),
    };
    if i < 0 {
        Ok((len as i64 + i).max(0) as usize)
    } else {
        Ok(i as usize)
    }
}

fn numeric_binary(
    left: &Value,
    right: &Value,
    span: Span,
    left_span: Span,
    right_span: Span,
    op: &str,
    apply: impl Fn(f64, f64) -> LapisResult<f64>,
) -> LapisResult<Value> {
    if !left.is_number() || !right.is_number() {
        return Err(error::type_mismatch_binary(span, left_span, right_span, op, left.type_name(), right.type_name()));
    }
    let result = apply(left.as_f64().unwrap(), right.as_f64().unwrap())?;
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        match op {
            "-" => return Ok(Value::Int(a - b)),
            "*" => return Ok(Value::Int(a * b)),
            "%" => return Ok(Value::Int(((a % b) + b) % b)),
            // A negative exponent (or any other non-integral outcome)
            // promotes to float instead of truncating.
            "**" if *b >= 0 && result.is_finite() && result.fract() == 0.0 => return Ok(Value::Int(result as i64)),
            "/" | "**" => {}
            _ => return Ok(Value::Float(result)),
        }
    }
    Ok(Value::Float(result))
}

fn comparison(
    left: &Value,
    right: &Value,
    span: Span,
    left_span: Span,
    right_span: Span,
    op: &str,
    apply: impl Fn(f64, f64) -> bool,
) -> LapisResult<Value> {
    if !left.is_number() || !right.is_number() {
        return Err(error::type_mismatch_binary(span, left_span, right_span, op, left.type_name(), right.type_name()));
    }
    Ok(Value::Bool(apply(left.as_f64().unwrap(), right.as_f64().unwrap())))
}

fn make_error_value(err: &crate::error::LapisError) -> Value {
    let mut dict = crate::value::Dict::new();
    dict.insert(DictKey::Str("message".into()), Value::str(err.diagnostic.message.clone()));
    dict.insert(DictKey::Str("code".into()), Value::str(err.diagnostic.code));
    Value::dict(dict)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

pub(crate) fn native(name: &str, arity: crate::value::Arity, func: impl Fn(&mut Interpreter, Vec<Value>, Span) -> LapisResult<Value> + 'static) -> Value {
    Value::Callable(Rc::new(NativeFunction { name: name.to_string(), arity, func: Box::new(func) }))
}

#[cfg(test)]
mod tests {
    use crate::eval_to_string;

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval_to_string("1 + 2 * 3;"), "7");
    }

    #[test]
    fn int_stays_int_through_arithmetic() {
        assert_eq!(eval_to_string("6 / 3;"), "2.0");
        assert_eq!(eval_to_string("7 - 2;"), "5");
    }

    #[test]
    fn modulo_is_floored_not_truncated() {
        assert_eq!(eval_to_string("-7 % 3;"), "2");
        assert_eq!(eval_to_string("7 % -3;"), "-2");
        assert_eq!(eval_to_string("-7.0 % 3.0;"), "2.0");
    }

    #[test]
    fn negative_integer_exponent_promotes_to_float() {
        assert_eq!(eval_to_string("2 ** -1;"), "0.5");
        assert_eq!(eval_to_string("2 ** 3;"), "8");
    }

    #[test]
    fn string_concat_coerces_the_other_operand() {
        assert_eq!(eval_to_string(r#""a" + "b";"#), "ab");
        assert_eq!(eval_to_string(r#"1 + "x";"#), "1x");
    }

    #[test]
    fn template_literal_reevaluates_in_current_scope() {
        assert_eq!(eval_to_string("var n = 5; `n is {n+1}`;"), "n is 6");
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let src = "
            func makeAdder(n)
                func add(x) return x + n; end
                return add;
            end
            var addFive = makeAdder(5);
            addFive(10);
        ";
        assert_eq!(eval_to_string(src), "15");
    }

    #[test]
    fn variadic_parameter_collects_trailing_args() {
        let src = "func f(a, b**) return b.length(); end f(1,2,3,4);";
        assert_eq!(eval_to_string(src), "3");
    }

    #[test]
    fn class_init_and_method() {
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
    fn class_without_init_takes_no_arguments() {
        let src = "
            class Empty() end
            Empty();
        ";
        assert_eq!(eval_to_string(src), "<instance of Empty>");
    }

    #[test]
    fn wrong_arity_on_construction_is_an_error() {
        let src = "
            class P()
                func init(n) this.n = n; end
            end
            P(1, 2);
        ";
        assert!(eval_to_string(src).starts_with("error [LAP3004]"));
    }

    #[test]
    fn try_catch_finally_runs_in_order() {
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
    fn finally_runs_even_without_a_catch_clause() {
        let src = r#"
            var log = [];
            try
                log.push("try");
                Console.error("boom");
            finally
                log.push("finally");
            end
        "#;
        // no catch clause means the error is still uncaught after finally runs.
        assert!(eval_to_string(src).starts_with("error [LAP4004]"));
    }

    #[test]
    fn switch_picks_first_matching_case_values_list() {
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
    fn for_in_iterates_an_array() {
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
    fn dict_literal_allows_trailing_comma_and_member_access() {
        assert_eq!(eval_to_string("var d = {a: 1, b: 2,}; d.a;"), "1");
    }

    #[test]
    fn dict_index_miss_is_null_not_an_error() {
        assert_eq!(eval_to_string("var d = {a: 1}; d[\"missing\"];"), "null");
    }

    #[test]
    fn nested_instance_field_access() {
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

    #[test]
    fn undefined_variable_reports_the_expected_code() {
        assert!(eval_to_string("missing;").starts_with("error [LAP4001]"));
    }

    #[test]
    fn package_import_with_use_exposes_only_named_public_symbols() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("lapis_interp_test_{}.lapis", std::process::id()));
        std::fs::write(&path, "public var x = 5; private var y = 6;").unwrap();

        let src = format!("package \"{}\" use x; x;", path.to_string_lossy());
        let result = eval_to_string(&src);
        let _ = std::fs::remove_file(&path);

        assert_eq!(result, "5");
    }

    #[test]
    fn package_import_without_use_skips_private_bindings() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("lapis_interp_test_priv_{}.lapis", std::process::id()));
        std::fs::write(&path, "public var x = 5; private var y = 6;").unwrap();

        let src = format!("package \"{}\"; y;", path.to_string_lossy());
        let result = eval_to_string(&src);
        let _ = std::fs::remove_file(&path);

        assert!(result.starts_with("error [LAP4001]"));
    }
}
