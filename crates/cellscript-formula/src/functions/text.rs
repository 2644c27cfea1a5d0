//! Text functions

use crate::error::FormulaResult;
use crate::value::Value;

/// join(separator, text, ...)
pub fn fn_join(args: &[Value]) -> FormulaResult<Value> {
    let Some((separator, rest)) = args.split_first() else {
        return Ok(Value::Text(String::new()));
    };
    let separator = separator.to_string();
    let parts: Vec<String> = rest.iter().map(Value::to_string).collect();
    Ok(Value::Text(parts.join(&separator)))
}
