//! Math functions

use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;

fn numbers(args: &[Value]) -> FormulaResult<Vec<f64>> {
    args.iter().map(Value::to_number).collect()
}

/// add(number, ...)
pub fn fn_add(args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(numbers(args)?.into_iter().sum()))
}

/// multiply(number, ...)
pub fn fn_multiply(args: &[Value]) -> FormulaResult<Value> {
    Ok(Value::Number(numbers(args)?.into_iter().product()))
}

/// divide(top, bottom, fallback)
///
/// A zero denominator yields the fallback when one is given, whatever `top` is.
pub fn fn_divide(args: &[Value]) -> FormulaResult<Value> {
    let (top, bottom) = match args {
        [top, bottom, ..] => (top, bottom),
        _ => return Err(FormulaError::NotEnoughArguments("divide".into())),
    };

    if matches!(bottom, Value::Number(n) if *n == 0.0) {
        return args.get(2).cloned().ok_or(FormulaError::DivideByZero);
    }

    Ok(Value::Number(top.to_number()? / bottom.to_number()?))
}

/// increment(number)
pub fn fn_increment(args: &[Value]) -> FormulaResult<Value> {
    let n = args.first().ok_or(FormulaError::InvalidOperation)?.to_number()?;
    Ok(Value::Number(n + 1.0))
}

/// decrement(number)
pub fn fn_decrement(args: &[Value]) -> FormulaResult<Value> {
    let n = args.first().ok_or(FormulaError::InvalidOperation)?.to_number()?;
    Ok(Value::Number(n - 1.0))
}

/// to_power(number, exponent)
pub fn fn_to_power(args: &[Value]) -> FormulaResult<Value> {
    match args {
        [base, exponent] => Ok(Value::Number(base.to_number()?.powf(exponent.to_number()?))),
        _ => Err(FormulaError::InvalidOperation),
    }
}
