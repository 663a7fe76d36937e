//! Tree-walking evaluator for parsed map functions
//!
//! One [`Interpreter`] exists per evaluation. It owns the variable scope, the
//! step and depth counters, and the last emission. Nothing survives the call.
//!
//! Every string, array or object the function builds passes through
//! `Interpreter::admit` before it can be stored or combined further.

use crate::ast::{BinaryOp, Expr, ForKind, Function, Literal, LogicalOp, Stmt, UnaryOp};
use crate::error::{ScriptError, ScriptResult};
use crate::value::{Builtin, ScriptValue};
use crate::Limits;
use std::collections::HashMap;

/// Control flow out of a statement
enum Flow {
    Normal,
    Return,
}

pub(crate) struct Interpreter {
    scope: HashMap<String, ScriptValue>,
    emitted: Option<(ScriptValue, ScriptValue)>,
    steps: u64,
    depth: usize,
    limits: Limits,
}

impl Interpreter {
    /// Run `function` with positional `args`, returning the last emission
    pub(crate) fn run(
        function: &Function,
        args: Vec<ScriptValue>,
        limits: Limits,
    ) -> ScriptResult<Option<(ScriptValue, ScriptValue)>> {
        let mut interp = Interpreter {
            scope: HashMap::new(),
            emitted: None,
            steps: 0,
            depth: 0,
            limits,
        };
        let mut args = args.into_iter();
        for param in &function.params {
            let value = args.next().unwrap_or(ScriptValue::Undefined);
            interp.scope.insert(param.clone(), value);
        }
        interp.exec_block(&function.body)?;
        Ok(interp.emitted)
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.steps += 1;
        if self.steps > self.limits.step_limit {
            return Err(ScriptError::StepLimitExceeded(self.limits.step_limit));
        }
        Ok(())
    }

    fn enter(&mut self) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(ScriptError::DepthLimitExceeded(self.limits.max_depth));
        }
        Ok(())
    }

    /// Reject a freshly built value that is too large or too deep
    fn admit(&self, value: ScriptValue) -> ScriptResult<ScriptValue> {
        if value.size() > self.limits.max_value_size {
            return Err(ScriptError::SizeLimitExceeded(self.limits.max_value_size));
        }
        if value.depth() > self.limits.max_depth {
            return Err(ScriptError::DepthLimitExceeded(self.limits.max_depth));
        }
        Ok(value)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_block(&mut self, stmts: &[Stmt]) -> ScriptResult<Flow> {
        for stmt in stmts {
            if let Flow::Return = self.exec(stmt)? {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        self.tick()?;
        self.enter()?;
        let flow = self.exec_inner(stmt);
        self.depth -= 1;
        flow
    }

    fn exec_inner(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Declare(name, init) => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => ScriptValue::Undefined,
                };
                self.scope.insert(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::If(cond, then, otherwise) => {
                if self.eval(cond)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::For {
                kind,
                binding,
                iterable,
                body,
            } => {
                let subject = self.eval(iterable)?;
                let items = match kind {
                    ForKind::Of => iterate_values(&subject)?,
                    ForKind::In => iterate_keys(&subject),
                };
                for item in items {
                    self.scope.insert(binding.clone(), item);
                    if let Flow::Return = self.exec(body)? {
                        return Ok(Flow::Return);
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                if let Some(expr) = value {
                    self.eval(expr)?;
                }
                Ok(Flow::Return)
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&mut self, expr: &Expr) -> ScriptResult<ScriptValue> {
        self.tick()?;
        self.enter()?;
        let value = self.eval_inner(expr);
        self.depth -= 1;
        value
    }

    fn eval_inner(&mut self, expr: &Expr) -> ScriptResult<ScriptValue> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Undefined => ScriptValue::Undefined,
                Literal::Null => ScriptValue::Null,
                Literal::Bool(b) => ScriptValue::Bool(*b),
                Literal::Number(n) => ScriptValue::Number(*n),
                Literal::Str(s) => ScriptValue::string(s.as_str()),
            }),
            Expr::Ident(name) => self.lookup(name),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<ScriptResult<Vec<_>>>()?;
                self.admit(ScriptValue::array(values))
            }
            Expr::Object(props) => {
                let mut map = std::collections::BTreeMap::new();
                for (name, value) in props {
                    let value = self.eval(value)?;
                    map.insert(name.clone(), value);
                }
                self.admit(ScriptValue::object(map))
            }
            Expr::Member(object, name) => {
                let object = self.eval(object)?;
                get_property(&object, name)
            }
            Expr::Index(object, index) => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                get_property(&object, &index.to_js_string())
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Unary(op, operand) => self.unary(*op, operand),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                if *op == BinaryOp::Add && (is_stringish(&lhs) || is_stringish(&rhs)) {
                    let mut out = lhs.to_js_string();
                    out.push_str(&rhs.to_js_string());
                    return self.admit(ScriptValue::string(out));
                }
                Ok(binary(*op, &lhs, &rhs))
            }
            Expr::Logical(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Assign(name, value) => {
                let value = self.eval(value)?;
                self.scope.insert(name.clone(), value.clone());
                Ok(value)
            }
        }
    }

    fn lookup(&self, name: &str) -> ScriptResult<ScriptValue> {
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        global(name).ok_or_else(|| ScriptError::runtime(format!("{} is not defined", name)))
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> ScriptResult<ScriptValue> {
        if op == UnaryOp::TypeOf {
            // typeof tolerates undeclared names
            if let Expr::Ident(name) = operand {
                if self.lookup(name).is_err() {
                    return Ok(ScriptValue::string("undefined"));
                }
            }
        }
        let value = self.eval(operand)?;
        Ok(match op {
            UnaryOp::Not => ScriptValue::Bool(!value.truthy()),
            UnaryOp::Neg => ScriptValue::Number(-value.to_number()),
            UnaryOp::Plus => ScriptValue::Number(value.to_number()),
            UnaryOp::TypeOf => ScriptValue::string(value.type_of()),
        })
    }

    fn eval_args(&mut self, args: &[Expr]) -> ScriptResult<Vec<ScriptValue>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> ScriptResult<ScriptValue> {
        if let Expr::Member(object, name) = callee {
            let receiver = self.eval(object)?;
            let argv = self.eval_args(args)?;
            return self.call_method(&receiver, name, argv);
        }
        let function = self.eval(callee)?;
        let argv = self.eval_args(args)?;
        match function {
            ScriptValue::Builtin(builtin) => self.call_builtin(builtin, argv),
            other => Err(ScriptError::runtime(format!(
                "{} is not a function",
                other.to_js_string()
            ))),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: Builtin,
        argv: Vec<ScriptValue>,
    ) -> ScriptResult<ScriptValue> {
        let mut argv = argv.into_iter();
        match builtin {
            Builtin::Emit => {
                let key = argv.next().unwrap_or(ScriptValue::Undefined);
                let value = argv.next().unwrap_or(ScriptValue::Undefined);
                self.emitted = Some((key, value));
                Ok(ScriptValue::Undefined)
            }
            Builtin::IsArray => Ok(ScriptValue::Bool(matches!(
                argv.next(),
                Some(ScriptValue::Array(_))
            ))),
            Builtin::ArrayNamespace => Err(ScriptError::runtime("Array is not a function")),
        }
    }

    fn call_method(
        &mut self,
        receiver: &ScriptValue,
        name: &str,
        argv: Vec<ScriptValue>,
    ) -> ScriptResult<ScriptValue> {
        let arg = |i: usize| argv.get(i).cloned().unwrap_or(ScriptValue::Undefined);

        match (receiver, name) {
            (ScriptValue::Undefined | ScriptValue::Null, _) => {
                return Err(ScriptError::runtime(format!(
                    "Cannot read properties of {} (reading '{}')",
                    receiver.to_js_string(),
                    name
                )))
            }
            (_, "toString") => return self.admit(ScriptValue::string(receiver.to_js_string())),
            (ScriptValue::String(s), _) => {
                if let Some(result) = string_method(s, name, &arg(0), &arg(1)) {
                    return self.admit(result);
                }
            }
            (ScriptValue::Array(items), "indexOf") => {
                let needle = arg(0);
                let pos = items.iter().position(|item| item.strict_eq(&needle));
                return Ok(ScriptValue::Number(pos.map(|p| p as f64).unwrap_or(-1.0)));
            }
            (ScriptValue::Array(items), "join") => {
                let sep = match arg(0) {
                    ScriptValue::Undefined => ",".to_string(),
                    other => other.to_js_string(),
                };
                let separators = sep.len().saturating_mul(items.len().saturating_sub(1));
                if separators > self.limits.max_value_size {
                    return Err(ScriptError::SizeLimitExceeded(self.limits.max_value_size));
                }
                let joined = items
                    .iter()
                    .map(|v| match v {
                        ScriptValue::Undefined | ScriptValue::Null => String::new(),
                        other => other.to_js_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(&sep);
                return self.admit(ScriptValue::string(joined));
            }
            _ => {}
        }

        match get_property(receiver, name)? {
            ScriptValue::Builtin(builtin) => self.call_builtin(builtin, argv),
            _ => Err(ScriptError::runtime(format!("{} is not a function", name))),
        }
    }
}

fn global(name: &str) -> Option<ScriptValue> {
    match name {
        "emit" => Some(ScriptValue::Builtin(Builtin::Emit)),
        "Array" => Some(ScriptValue::Builtin(Builtin::ArrayNamespace)),
        "NaN" => Some(ScriptValue::Number(f64::NAN)),
        "Infinity" => Some(ScriptValue::Number(f64::INFINITY)),
        _ => None,
    }
}

fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse::<usize>().ok()
}

fn get_property(object: &ScriptValue, name: &str) -> ScriptResult<ScriptValue> {
    Ok(match object {
        ScriptValue::Undefined | ScriptValue::Null => {
            return Err(ScriptError::runtime(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_js_string(),
                name
            )))
        }
        ScriptValue::String(s) => {
            if name == "length" {
                ScriptValue::Number(s.chars().count() as f64)
            } else if let Some(i) = array_index(name) {
                s.chars()
                    .nth(i)
                    .map(|c| ScriptValue::string(c.to_string()))
                    .unwrap_or(ScriptValue::Undefined)
            } else {
                ScriptValue::Undefined
            }
        }
        ScriptValue::Array(items) => {
            if name == "length" {
                ScriptValue::Number(items.len() as f64)
            } else if let Some(i) = array_index(name) {
                items.get(i).cloned().unwrap_or(ScriptValue::Undefined)
            } else {
                ScriptValue::Undefined
            }
        }
        ScriptValue::Object(map) => map.get(name).cloned().unwrap_or(ScriptValue::Undefined),
        ScriptValue::Builtin(Builtin::ArrayNamespace) if name == "isArray" => {
            ScriptValue::Builtin(Builtin::IsArray)
        }
        _ => ScriptValue::Undefined,
    })
}

fn string_method(
    s: &str,
    name: &str,
    a: &ScriptValue,
    b: &ScriptValue,
) -> Option<ScriptValue> {
    Some(match name {
        "toLowerCase" => ScriptValue::string(s.to_lowercase()),
        "toUpperCase" => ScriptValue::string(s.to_uppercase()),
        "trim" => ScriptValue::string(s.trim()),
        "indexOf" => {
            let needle = a.to_js_string();
            let pos = s
                .find(needle.as_str())
                .map(|byte| s[..byte].chars().count() as f64)
                .unwrap_or(-1.0);
            ScriptValue::Number(pos)
        }
        "substring" => {
            let len = s.chars().count();
            let clamp = |v: &ScriptValue, default: usize| -> usize {
                match v {
                    ScriptValue::Undefined => default,
                    other => {
                        let n = other.to_number();
                        if n.is_nan() || n < 0.0 {
                            0
                        } else {
                            (n as usize).min(len)
                        }
                    }
                }
            };
            let (mut start, mut end) = (clamp(a, 0), clamp(b, len));
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
            ScriptValue::string(s.chars().skip(start).take(end - start).collect::<String>())
        }
        "split" => {
            let parts: Vec<ScriptValue> = match a {
                ScriptValue::Undefined => vec![ScriptValue::string(s)],
                sep => {
                    let sep = sep.to_js_string();
                    if sep.is_empty() {
                        s.chars().map(|c| ScriptValue::string(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(ScriptValue::string).collect()
                    }
                }
            };
            ScriptValue::array(parts)
        }
        _ => return None,
    })
}

fn iterate_values(subject: &ScriptValue) -> ScriptResult<Vec<ScriptValue>> {
    match subject {
        ScriptValue::Array(items) => Ok(items.to_vec()),
        ScriptValue::String(s) => Ok(s
            .chars()
            .map(|c| ScriptValue::string(c.to_string()))
            .collect()),
        other => Err(ScriptError::runtime(format!(
            "{} is not iterable",
            other.to_js_string()
        ))),
    }
}

fn iterate_keys(subject: &ScriptValue) -> Vec<ScriptValue> {
    match subject {
        ScriptValue::Object(map) => map.keys().map(|k| ScriptValue::string(k.as_str())).collect(),
        ScriptValue::Array(items) => (0..items.len())
            .map(|i| ScriptValue::string(i.to_string()))
            .collect(),
        ScriptValue::String(s) => (0..s.chars().count())
            .map(|i| ScriptValue::string(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Operands that make `+` concatenate
fn is_stringish(value: &ScriptValue) -> bool {
    matches!(
        value,
        ScriptValue::String(_) | ScriptValue::Array(_) | ScriptValue::Object(_)
    )
}

/// Binary operators on already-evaluated operands
///
/// String concatenation is handled by the interpreter, which checks the size
/// of the result.
fn binary(op: BinaryOp, lhs: &ScriptValue, rhs: &ScriptValue) -> ScriptValue {
    use ScriptValue::{Bool, Number};

    match op {
        BinaryOp::Add => Number(lhs.to_number() + rhs.to_number()),
        BinaryOp::Sub => Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (ScriptValue::String(a), ScriptValue::String(b)) => Some(a.cmp(b)),
                _ => lhs.to_number().partial_cmp(&rhs.to_number()),
            };
            Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o.is_lt(),
                (BinaryOp::Le, Some(o)) => o.is_le(),
                (BinaryOp::Gt, Some(o)) => o.is_gt(),
                (_, Some(o)) => o.is_ge(),
            })
        }
        BinaryOp::LooseEq => Bool(lhs.loose_eq(rhs)),
        BinaryOp::LooseNe => Bool(!lhs.loose_eq(rhs)),
        BinaryOp::StrictEq => Bool(lhs.strict_eq(rhs)),
        BinaryOp::StrictNe => Bool(!lhs.strict_eq(rhs)),
    }
}
