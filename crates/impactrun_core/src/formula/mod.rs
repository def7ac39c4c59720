//! Formula compiler.
//!
//! A formula string is parsed once into a tagged expression tree whose
//! variables are resolved to dense [`VarId`] slots. The compiled [`Formula`]
//! is immutable and `Send + Sync`; binding it against a [`Bindings`] table
//! reduces it to a single checked scalar.
//!
//! ```ignore
//! let table = registry.variables();
//! let formula = Formula::compile("mass * exp(-k)", table)?;
//! let value = formula.bind(&registry.bind(&assignment)?)?;
//! ```

mod eval;
mod parser;
mod token;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, FormulaError};
use crate::model::VarId;

use parser::{BinOp, Syntax};
use token::syntax_error;

/// Resolves variable names appearing in formulas to slots
pub trait VariableResolver {
    fn resolve(&self, name: &str) -> Option<VarId>;
}

impl VariableResolver for FxHashMap<String, VarId> {
    fn resolve(&self, name: &str) -> Option<VarId> {
        self.get(name).copied()
    }
}

impl VariableResolver for [(&str, VarId)] {
    fn resolve(&self, name: &str) -> Option<VarId> {
        self.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Exp,
    /// Natural log, or log in an explicit base with two arguments
    Ln,
    Log10,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Pow,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<(Func, usize, usize)> {
        let entry = match name {
            "exp" => (Func::Exp, 1, 1),
            "log" | "ln" => (Func::Ln, 1, 2),
            "log10" => (Func::Log10, 1, 1),
            "sqrt" => (Func::Sqrt, 1, 1),
            "abs" | "Abs" => (Func::Abs, 1, 1),
            "sin" => (Func::Sin, 1, 1),
            "cos" => (Func::Cos, 1, 1),
            "tan" => (Func::Tan, 1, 1),
            "floor" => (Func::Floor, 1, 1),
            "ceil" | "ceiling" => (Func::Ceil, 1, 1),
            "pow" => (Func::Pow, 2, 2),
            "min" | "Min" => (Func::Min, 2, 2),
            "max" | "Max" => (Func::Max, 2, 2),
            _ => return None,
        };
        Some(entry)
    }

    fn name(self) -> &'static str {
        match self {
            Func::Exp => "exp",
            Func::Ln => "log",
            Func::Log10 => "log10",
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Pow => "pow",
            Func::Min => "min",
            Func::Max => "max",
        }
    }
}

/// Resolved expression tree
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Const(f64),
    Var(VarId),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
    /// `(value, condition)` pairs, first non-zero condition wins
    Piecewise(Vec<(Expr, Expr)>),
}

/// Concrete values for every variable slot of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    values: Vec<Option<f64>>,
}

impl Bindings {
    /// Create a table with `len` unbound slots
    #[must_use]
    pub fn unbound(len: usize) -> Self {
        Self {
            values: vec![None; len],
        }
    }

    pub fn set(&mut self, var: VarId, value: f64) {
        if let Some(slot) = self.values.get_mut(var.index()) {
            *slot = Some(value);
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A compiled formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
    /// Free variables with the name they were written as, in order of first use
    variables: Vec<(VarId, String)>,
}

impl Formula {
    /// Parse `expression` and resolve its variables against `known`.
    pub fn compile<R: VariableResolver + ?Sized>(
        expression: &str,
        known: &R,
    ) -> Result<Self, FormulaError> {
        let tree = parser::parse(expression)?;
        let mut variables = Vec::new();
        let expr = lower(expression, &tree, known, &mut variables)?;
        let expr = if variables.is_empty() {
            fold_constant(expr)
        } else {
            expr
        };
        Ok(Self {
            source: expression.trim().to_string(),
            expr,
            variables,
        })
    }

    /// A formula that always evaluates to `value`
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            source: format_constant(value),
            expr: Expr::Const(value),
            variables: Vec::new(),
        }
    }

    /// Reduce the formula to a scalar using the bound variable values
    #[inline]
    pub fn bind(&self, bindings: &Bindings) -> Result<f64, EvalError> {
        eval::eval(&self.expr, bindings, &self.variables)
    }

    /// The value of a formula without free variables, if it can be folded
    #[must_use]
    pub fn constant_value(&self) -> Option<f64> {
        match self.expr {
            Expr::Const(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.variables.iter().map(|(id, _)| *id)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(_, name)| name.as_str())
    }

    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.variables.is_empty()
    }
}

impl Serialize for Formula {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Free identifiers of an expression without resolving them.
///
/// Used to validate formulas against a parameter registry before compiling.
pub fn free_variables(expression: &str) -> Result<Vec<String>, FormulaError> {
    let tree = parser::parse(expression)?;
    let mut names = Vec::new();
    parser::identifiers(&tree, &mut names);
    names.retain(|n| builtin_constant(n).is_none());
    Ok(names)
}

/// A formula as written in a model definition: a string or a bare number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormulaSource {
    Number(f64),
    Text(String),
}

impl FormulaSource {
    pub fn compile<R: VariableResolver + ?Sized>(
        &self,
        known: &R,
    ) -> Result<Formula, FormulaError> {
        match self {
            FormulaSource::Number(v) => Ok(Formula::constant(*v)),
            FormulaSource::Text(text) => Formula::compile(text, known),
        }
    }

    pub fn free_variables(&self) -> Result<Vec<String>, FormulaError> {
        match self {
            FormulaSource::Number(_) => Ok(Vec::new()),
            FormulaSource::Text(text) => free_variables(text),
        }
    }
}

impl Default for FormulaSource {
    fn default() -> Self {
        FormulaSource::Number(1.0)
    }
}

impl From<f64> for FormulaSource {
    fn from(value: f64) -> Self {
        FormulaSource::Number(value)
    }
}

impl From<&str> for FormulaSource {
    fn from(value: &str) -> Self {
        FormulaSource::Text(value.to_string())
    }
}

impl From<String> for FormulaSource {
    fn from(value: String) -> Self {
        FormulaSource::Text(value)
    }
}

fn format_constant(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn builtin_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        "True" => Some(1.0),
        "False" => Some(0.0),
        _ => None,
    }
}

fn lower<R: VariableResolver + ?Sized>(
    input: &str,
    tree: &Syntax,
    known: &R,
    variables: &mut Vec<(VarId, String)>,
) -> Result<Expr, FormulaError> {
    match tree {
        Syntax::Number(v) => Ok(Expr::Const(*v)),
        Syntax::Ident { name, .. } => {
            // Declared variables shadow the builtin constants
            if let Some(id) = known.resolve(name) {
                if !variables.iter().any(|(v, _)| *v == id) {
                    variables.push((id, name.clone()));
                }
                return Ok(Expr::Var(id));
            }
            builtin_constant(name)
                .map(Expr::Const)
                .ok_or_else(|| FormulaError::UnknownVariable { name: name.clone() })
        }
        Syntax::Neg(inner) => Ok(Expr::Neg(Box::new(lower(input, inner, known, variables)?))),
        Syntax::Binary(op, lhs, rhs) => Ok(Expr::Binary(
            *op,
            Box::new(lower(input, lhs, known, variables)?),
            Box::new(lower(input, rhs, known, variables)?),
        )),
        Syntax::Call { name, args, .. } if name == "Piecewise" => {
            if args.is_empty() {
                return Err(FormulaError::Arity {
                    function: "Piecewise",
                    expected: "at least 1",
                    found: 0,
                });
            }
            let mut branches = Vec::with_capacity(args.len());
            for arg in args {
                let Syntax::Tuple { items, start } = arg else {
                    return Err(syntax_error(
                        input,
                        0,
                        "Piecewise arguments must be (value, condition) pairs",
                    ));
                };
                if items.len() != 2 {
                    return Err(syntax_error(
                        input,
                        *start,
                        "Piecewise arguments must be (value, condition) pairs",
                    ));
                }
                branches.push((
                    lower(input, &items[0], known, variables)?,
                    lower(input, &items[1], known, variables)?,
                ));
            }
            Ok(Expr::Piecewise(branches))
        }
        Syntax::Call { name, args, .. } => {
            let (func, min_args, max_args) = Func::lookup(name)
                .ok_or_else(|| FormulaError::UnknownFunction { name: name.clone() })?;
            if args.len() < min_args || args.len() > max_args {
                return Err(FormulaError::Arity {
                    function: func.name(),
                    expected: match (min_args, max_args) {
                        (1, 1) => "1",
                        (2, 2) => "2",
                        _ => "1 or 2",
                    },
                    found: args.len(),
                });
            }
            let args = args
                .iter()
                .map(|a| lower(input, a, known, variables))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Call(func, args))
        }
        Syntax::Tuple { start, .. } => Err(syntax_error(
            input,
            *start,
            "tuples are only allowed as Piecewise arguments",
        )),
    }
}

/// Collapse a variable-free expression; failures are kept for bind time
fn fold_constant(expr: Expr) -> Expr {
    let empty = Bindings::unbound(0);
    match eval::eval(&expr, &empty, &[]) {
        Ok(value) => Expr::Const(value),
        Err(_) => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BindingError, NumericError};

    fn scope() -> Vec<(&'static str, VarId)> {
        vec![("x", VarId(0)), ("y", VarId(1)), ("mode_a", VarId(2))]
    }

    fn bindings(values: &[(u32, f64)]) -> Bindings {
        let mut b = Bindings::unbound(3);
        for (id, v) in values {
            b.set(VarId(*id), *v);
        }
        b
    }

    fn eval_str(expr: &str, values: &[(u32, f64)]) -> Result<f64, EvalError> {
        Formula::compile(expr, scope().as_slice())
            .unwrap()
            .bind(&bindings(values))
    }

    #[test]
    fn test_constants_bind_to_themselves() {
        for (text, expected) in [("0", 0.0), ("1.0", 1.0), ("2 * 3 + 1", 7.0), ("-4", -4.0)] {
            let formula = Formula::compile(text, scope().as_slice()).unwrap();
            assert!(formula.is_constant());
            assert_eq!(formula.constant_value(), Some(expected));
            assert_eq!(formula.bind(&Bindings::unbound(0)).unwrap(), expected);
        }
    }

    #[test]
    fn test_arithmetic_and_functions() {
        let v = eval_str("x ** 2 + sqrt(y) - exp(0)", &[(0, 3.0), (1, 16.0)]).unwrap();
        assert!((v - 12.0).abs() < 1e-12);
        let v = eval_str("max(x, y) / min(x, y)", &[(0, 2.0), (1, 8.0)]).unwrap();
        assert!((v - 4.0).abs() < 1e-12);
        let v = eval_str("2 ^ 3 % 5", &[]).unwrap();
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_piecewise_with_indicator() {
        let expr = "Piecewise((1000, mode_a), (100, True))";
        assert_eq!(eval_str(expr, &[(2, 1.0)]).unwrap(), 1000.0);
        assert_eq!(eval_str(expr, &[(2, 0.0)]).unwrap(), 100.0);
    }

    #[test]
    fn test_piecewise_without_match_fails() {
        let err = eval_str("Piecewise((1, x > 5))", &[(0, 1.0)]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Numeric(NumericError::Domain {
                function: "Piecewise",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_variable_named() {
        let err = Formula::compile("x * undeclared_param", scope().as_slice()).unwrap_err();
        assert_eq!(
            err,
            FormulaError::UnknownVariable {
                name: "undeclared_param".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert!(matches!(
            Formula::compile("gamma(x)", scope().as_slice()),
            Err(FormulaError::UnknownFunction { .. })
        ));
        assert!(matches!(
            Formula::compile("sqrt(x, y)", scope().as_slice()),
            Err(FormulaError::Arity { function: "sqrt", found: 2, .. })
        ));
    }

    #[test]
    fn test_missing_binding_names_variable() {
        let err = eval_str("x + y", &[(0, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            EvalError::Binding(BindingError::MissingBinding("y".to_string()))
        );
    }

    #[test]
    fn test_numeric_errors_surface_at_bind() {
        let formula = Formula::compile("1 / 0", scope().as_slice()).unwrap();
        assert!(!matches!(formula.constant_value(), Some(_)));
        assert_eq!(
            formula.bind(&Bindings::unbound(0)),
            Err(EvalError::Numeric(NumericError::DivisionByZero))
        );
        assert!(matches!(
            eval_str("sqrt(x)", &[(0, -1.0)]),
            Err(EvalError::Numeric(NumericError::Domain { .. }))
        ));
    }

    #[test]
    fn test_free_variables_skip_builtins() {
        let names = free_variables("a * pi + Piecewise((b, c_X), (0, True))").unwrap();
        assert_eq!(names, vec!["a", "b", "c_X"]);
    }

    #[test]
    fn test_variables_deduplicated() {
        let formula = Formula::compile("x * x + y", scope().as_slice()).unwrap();
        assert_eq!(formula.variable_names().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_repeated_binding_is_deterministic() {
        let formula = Formula::compile("exp(x) / (1 + y ** 0.5)", scope().as_slice()).unwrap();
        let b = bindings(&[(0, 0.3), (1, 2.0)]);
        let first = formula.bind(&b).unwrap();
        let second = formula.bind(&b).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }
}
