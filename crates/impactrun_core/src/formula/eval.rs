//! Checked evaluation of resolved expressions.
//!
//! Every operation that can leave the real line reports a `NumericError`
//! instead of producing `inf`/`NaN`.

use crate::error::{BindingError, EvalError, NumericError};

use super::parser::BinOp;
use super::{Bindings, Expr, Func};

#[inline]
fn finite(value: f64, operation: &'static str) -> Result<f64, NumericError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NumericError::NonFinite { operation })
    }
}

#[inline]
fn truth(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

pub(super) fn eval(
    expr: &Expr,
    bindings: &Bindings,
    names: &[(crate::model::VarId, String)],
) -> Result<f64, EvalError> {
    match expr {
        Expr::Const(v) => Ok(*v),
        Expr::Var(id) => bindings.get(*id).ok_or_else(|| {
            let name = names
                .iter()
                .find(|(var, _)| var == id)
                .map_or_else(|| format!("#{}", id.0), |(_, n)| n.clone());
            EvalError::Binding(BindingError::MissingBinding(name))
        }),
        Expr::Neg(inner) => Ok(-eval(inner, bindings, names)?),
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs, bindings, names)?;
            let b = eval(rhs, bindings, names)?;
            Ok(apply_binary(*op, a, b)?)
        }
        Expr::Call(func, args) => {
            let mut values = [0.0f64; 2];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = eval(arg, bindings, names)?;
            }
            Ok(apply_func(*func, &values[..args.len().min(2)])?)
        }
        Expr::Piecewise(branches) => {
            for (value, condition) in branches {
                if eval(condition, bindings, names)? != 0.0 {
                    return eval(value, bindings, names);
                }
            }
            Err(EvalError::Numeric(NumericError::Domain {
                function: "Piecewise",
                argument: f64::NAN,
            }))
        }
    }
}

pub(super) fn apply_binary(op: BinOp, a: f64, b: f64) -> Result<f64, NumericError> {
    match op {
        BinOp::Add => finite(a + b, "addition"),
        BinOp::Sub => finite(a - b, "subtraction"),
        BinOp::Mul => finite(a * b, "multiplication"),
        BinOp::Div => {
            if b == 0.0 {
                return Err(NumericError::DivisionByZero);
            }
            finite(a / b, "division")
        }
        BinOp::Rem => {
            if b == 0.0 {
                return Err(NumericError::DivisionByZero);
            }
            // Sign follows the divisor
            finite(a - b * (a / b).floor(), "modulo")
        }
        BinOp::Pow => {
            let value = a.powf(b);
            if value.is_nan() || (a == 0.0 && b < 0.0) {
                return Err(NumericError::Domain {
                    function: "pow",
                    argument: a,
                });
            }
            finite(value, "exponentiation")
        }
        BinOp::Lt => Ok(truth(a < b)),
        BinOp::Le => Ok(truth(a <= b)),
        BinOp::Gt => Ok(truth(a > b)),
        BinOp::Ge => Ok(truth(a >= b)),
        BinOp::Eq => Ok(truth((a - b).abs() < f64::EPSILON)),
        BinOp::Ne => Ok(truth((a - b).abs() >= f64::EPSILON)),
    }
}

pub(super) fn apply_func(func: Func, args: &[f64]) -> Result<f64, NumericError> {
    let x = args[0];
    match func {
        Func::Exp => finite(x.exp(), "exp"),
        Func::Ln => {
            if x <= 0.0 {
                return Err(NumericError::Domain {
                    function: "log",
                    argument: x,
                });
            }
            if let Some(&base) = args.get(1) {
                if base <= 0.0 || base == 1.0 {
                    return Err(NumericError::Domain {
                        function: "log",
                        argument: base,
                    });
                }
                return finite(x.ln() / base.ln(), "log");
            }
            Ok(x.ln())
        }
        Func::Log10 => {
            if x <= 0.0 {
                return Err(NumericError::Domain {
                    function: "log10",
                    argument: x,
                });
            }
            Ok(x.log10())
        }
        Func::Sqrt => {
            if x < 0.0 {
                return Err(NumericError::Domain {
                    function: "sqrt",
                    argument: x,
                });
            }
            Ok(x.sqrt())
        }
        Func::Abs => Ok(x.abs()),
        Func::Sin => Ok(x.sin()),
        Func::Cos => Ok(x.cos()),
        Func::Tan => finite(x.tan(), "tan"),
        Func::Floor => Ok(x.floor()),
        Func::Ceil => Ok(x.ceil()),
        Func::Pow => apply_binary(BinOp::Pow, x, args[1]),
        Func::Min => Ok(x.min(args[1])),
        Func::Max => Ok(x.max(args[1])),
    }
}
