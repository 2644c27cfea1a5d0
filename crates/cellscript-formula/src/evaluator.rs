//! Formula evaluator
//!
//! Evaluates ASTs against a read-only snapshot of other cells' results.
//! There is no precedence: each expression is folded strictly left to right.

use crate::ast::{Ast, Call, Expression, Node};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionCatalog;
use crate::value::Value;
use ahash::AHashMap;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Source of referenced cells' results
pub trait ReferenceLookup {
    /// The stored result for `name`, or `None` if the cell is unknown
    fn lookup(&self, name: &str) -> Option<&FormulaResult<Value>>;
}

impl<S: BuildHasher> ReferenceLookup for HashMap<String, FormulaResult<Value>, S> {
    fn lookup(&self, name: &str) -> Option<&FormulaResult<Value>> {
        self.get(name)
    }
}

impl ReferenceLookup for AHashMap<String, FormulaResult<Value>> {
    fn lookup(&self, name: &str) -> Option<&FormulaResult<Value>> {
        self.get(name)
    }
}

impl ReferenceLookup for BTreeMap<String, FormulaResult<Value>> {
    fn lookup(&self, name: &str) -> Option<&FormulaResult<Value>> {
        self.get(name)
    }
}

/// Lookup with no cells in it
struct NoReferences;

impl ReferenceLookup for NoReferences {
    fn lookup(&self, _name: &str) -> Option<&FormulaResult<Value>> {
        None
    }
}

/// Evaluation settings
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    /// Decimal places numeric results are rounded to, half away from zero
    /// (default: 5). `None` disables rounding.
    pub decimal_places: Option<u32>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            decimal_places: Some(5),
        }
    }
}

/// Everything an evaluation reads
pub struct EvaluationContext<'a> {
    /// Results of other cells, by reference name
    pub references: &'a dyn ReferenceLookup,
    /// Functions callable from formulas
    pub catalog: &'a FunctionCatalog,
    pub options: EvaluateOptions,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context over a reference snapshot with the built-in functions
    pub fn new(references: &'a dyn ReferenceLookup) -> Self {
        Self {
            references,
            catalog: FunctionCatalog::builtin(),
            options: EvaluateOptions::default(),
        }
    }

    /// Create a context without references (for testing)
    pub fn simple() -> Self {
        Self::new(&NoReferences)
    }

    pub fn with_catalog(mut self, catalog: &'a FunctionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Evaluate a parsed cell input
///
/// # Example
/// ```rust
/// use cellscript_formula::{evaluate, parse, EvaluationContext, Value};
///
/// let ast = parse("=1/3").unwrap();
/// let value = evaluate(&ast, &EvaluationContext::simple()).unwrap();
/// assert_eq!(value, Value::Number(0.33333));
/// ```
pub fn evaluate(ast: &Ast, ctx: &EvaluationContext) -> FormulaResult<Value> {
    let result = match ast {
        Ast::Empty => Ok(Value::Text(String::new())),
        Ast::Primitive(value) => Ok(value.clone()),
        // A lone `=` shows what was typed
        Ast::Formula(body) if body.items.is_empty() => Ok(Value::Text("=".to_string())),
        Ast::Formula(body) => evaluate_expression(body, ctx),
    };

    match result {
        Ok(value) => Ok(round_result(value, ctx.options.decimal_places)),
        Err(e) => {
            tracing::trace!(error = %e, "evaluation failed");
            Err(e)
        }
    }
}

fn evaluate_expression(expr: &Expression, ctx: &EvaluationContext) -> FormulaResult<Value> {
    let mut items = expr.significant();

    let first = items.next().ok_or(FormulaError::InvalidOperation)?;
    let mut acc = evaluate_node(first, ctx)?;

    while let Some(node) = items.next() {
        let Node::Operator(op) = node else {
            return Err(FormulaError::InvalidOperation);
        };
        let operand = items.next().ok_or(FormulaError::InvalidOperation)?;
        let right = evaluate_node(operand, ctx)?;

        acc = match op.apply(&acc, &right) {
            Ok(value) => value,
            Err(e) => {
                tracing::trace!(
                    operator = %op,
                    left = acc.type_name(),
                    right = right.type_name(),
                    "operator failed"
                );
                return Err(e);
            }
        };
    }

    Ok(acc)
}

fn evaluate_node(node: &Node, ctx: &EvaluationContext) -> FormulaResult<Value> {
    match node {
        Node::Number(n) => Ok(Value::Number(*n)),
        Node::Text(s) => Ok(Value::Text(s.clone())),
        Node::Boolean(b) => Ok(Value::Boolean(*b)),
        Node::Reference(name) => resolve_reference(name, ctx),
        Node::Partial(_) => Err(FormulaError::IncompleteFunction),
        Node::Function(call) => evaluate_function(call, ctx),
        Node::Whitespace(_) | Node::Operator(_) => Err(FormulaError::InvalidOperation),
    }
}

fn resolve_reference(name: &str, ctx: &EvaluationContext) -> FormulaResult<Value> {
    match ctx.references.lookup(name) {
        Some(Ok(value)) => Ok(value.clone()),
        Some(Err(_)) => Err(FormulaError::ReferencedCell(name.to_string())),
        None => Err(FormulaError::MissingReference(name.to_string())),
    }
}

fn evaluate_function(call: &Call, ctx: &EvaluationContext) -> FormulaResult<Value> {
    let func = ctx
        .catalog
        .get(&call.name)
        .ok_or_else(|| FormulaError::UnsupportedFunction(call.name.clone()))?;

    // Arity is checked before any argument is evaluated
    let args: Vec<&Expression> = call.value_args().collect();
    if let Some((min, max)) = func.arity.bounds() {
        if args.len() < min {
            return Err(FormulaError::NotEnoughArguments(call.name.clone()));
        }
        if args.len() > max {
            return Err(FormulaError::TooManyArguments(call.name.clone()));
        }
    }

    let evaluated_args = args
        .into_iter()
        .map(|arg| evaluate_expression(arg, ctx))
        .collect::<FormulaResult<Vec<_>>>()?;

    (func.implementation)(&evaluated_args)
}

/// Round a finite numeric result; anything else passes through
fn round_result(value: Value, decimal_places: Option<u32>) -> Value {
    match (value, decimal_places) {
        (Value::Number(n), Some(dp)) if n.is_finite() => Value::Number(round_to(n, dp)),
        (value, _) => value,
    }
}

fn round_to(n: f64, dp: u32) -> f64 {
    Decimal::from_f64(n)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(n)
}
