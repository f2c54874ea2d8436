use crate::types::CompiledExpr;
use crate::{BinaryOp, CompareOp, EvalError, Facts, UnaryOp, Value};

pub(crate) fn evaluate(expr: &CompiledExpr, facts: &Facts) -> Result<Value, EvalError> {
    match expr {
        CompiledExpr::Literal(value) => Ok(value.clone()),
        CompiledExpr::Fact(name) => facts
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::MissingFact { name: name.clone() }),
        CompiledExpr::Unary { op, operand } => {
            let value = evaluate(operand, facts)?;
            unary(*op, value)
        }
        CompiledExpr::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => {
            if !truthy(BinaryOp::And, evaluate(left, facts)?)? {
                return Ok(Value::Bool(false));
            }
            truthy(BinaryOp::And, evaluate(right, facts)?).map(Value::Bool)
        }
        CompiledExpr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            if truthy(BinaryOp::Or, evaluate(left, facts)?)? {
                return Ok(Value::Bool(true));
            }
            truthy(BinaryOp::Or, evaluate(right, facts)?).map(Value::Bool)
        }
        CompiledExpr::Binary { op, left, right } => {
            let left = evaluate(left, facts)?;
            let right = evaluate(right, facts)?;
            binary(*op, &left, &right)
        }
        CompiledExpr::Call {
            name,
            function,
            args,
        } => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, facts))
                .collect::<Result<Vec<_>, _>>()?;
            function(args.as_slice()).map_err(|source| EvalError::Function {
                name: name.clone(),
                source,
            })
        }
    }
}

fn truthy(op: BinaryOp, value: Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::InvalidOperand {
        op: op.to_string(),
        expected: "bool",
        found: value.type_name(),
    })
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Overflow { op: op.to_string() }),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, value) => Err(EvalError::InvalidOperand {
            op: op.to_string(),
            expected: if op == UnaryOp::Not { "bool" } else { "number" },
            found: value.type_name(),
        }),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Compare(cmp) => compare(cmp, left, right),
        BinaryOp::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => arithmetic(op, left, right, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            if matches!(right, Value::Int(0)) && matches!(left, Value::Int(_)) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic(op, left, right, i64::checked_div, |a, b| a / b)
        }
        BinaryOp::Rem => {
            if matches!(right, Value::Int(0)) && matches!(left, Value::Int(_)) {
                return Err(EvalError::DivisionByZero);
            }
            arithmetic(op, left, right, i64::checked_rem, |a, b| a % b)
        }
        // Short-circuit operators are handled before operands are evaluated.
        BinaryOp::And | BinaryOp::Or => {
            let lhs = truthy(op, left.clone())?;
            let rhs = truthy(op, right.clone())?;
            Ok(Value::Bool(if op == BinaryOp::And {
                lhs && rhs
            } else {
                lhs || rhs
            }))
        }
    }
}

/// Equality between incompatible types is `false`; ordering them is an error.
fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match left.compare(op, right) {
        Some(result) => Ok(Value::Bool(result)),
        None => match op {
            CompareOp::Eq => Ok(Value::Bool(false)),
            CompareOp::Neq => Ok(Value::Bool(true)),
            _ => Err(EvalError::TypeMismatch {
                op: op.to_string(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        },
    }
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| EvalError::Overflow { op: op.to_string() }),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(EvalError::TypeMismatch {
                op: op.to_string(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        },
    }
}
