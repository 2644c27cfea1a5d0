//! Logical functions

use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;

/// if(test, value if true, value if false)
pub fn fn_if(args: &[Value]) -> FormulaResult<Value> {
    match args {
        [test, if_true, if_false] => Ok(if test.is_truthy() {
            if_true.clone()
        } else {
            if_false.clone()
        }),
        _ => Err(FormulaError::InvalidOperation),
    }
}

/// Identity, called by parenthesised groups
pub fn fn_group(args: &[Value]) -> FormulaResult<Value> {
    args.first().cloned().ok_or(FormulaError::InvalidOperation)
}
