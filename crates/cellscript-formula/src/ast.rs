//! Formula Abstract Syntax Tree types
//!
//! Operators do not form binary nodes: an [`Expression`] is a flat run of
//! operands, operators and whitespace in source order, and is folded strictly
//! left to right at evaluation time. Whitespace is kept so the formula can be
//! re-rendered exactly as typed.

use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;
use std::fmt;

/// A parsed cell input
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// Empty cell text
    Empty,
    /// A bare literal such as `3`, `"str"` or `true`
    Primitive(Value),
    /// Anything starting with `=`; the body is empty for a lone `=`
    Formula(Expression),
}

impl Ast {
    /// Formula body, if this is a formula
    pub fn body(&self) -> Option<&Expression> {
        match self {
            Ast::Formula(body) => Some(body),
            _ => None,
        }
    }

    /// Look up a node by structural path (see [`NodePath`])
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        self.body()?.node_at(path)
    }

    /// Look up the expression an even-length path points at
    pub fn expression_at(&self, path: &[usize]) -> Option<&Expression> {
        self.body()?.expression_at(path)
    }
}

/// A flat run of nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    pub items: Vec<Node>,
}

impl Expression {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }

    /// An argument made only of whitespace, kept between call arguments
    pub fn whitespace(text: impl Into<String>) -> Self {
        Self {
            items: vec![Node::Whitespace(text.into())],
        }
    }

    /// True when every item is whitespace (including the empty expression)
    pub fn is_whitespace_only(&self) -> bool {
        self.items.iter().all(Node::is_whitespace)
    }

    /// Items with whitespace filtered out
    pub fn significant(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().filter(|n| !n.is_whitespace())
    }

    /// Walk a path relative to this expression.
    ///
    /// Odd positions are item indices, even positions argument indices.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let node = self.items.get(first)?;
        match rest.split_first() {
            None => Some(node),
            Some((&arg, tail)) => match node {
                Node::Function(call) => call.args.get(arg)?.node_at(tail),
                _ => None,
            },
        }
    }

    /// Walk an even-length path to an expression (the empty path is `self`)
    pub fn expression_at(&self, path: &[usize]) -> Option<&Expression> {
        match path {
            [] => Some(self),
            [item, arg, rest @ ..] => match self.items.get(*item)? {
                Node::Function(call) => call.args.get(*arg)?.expression_at(rest),
                _ => None,
            },
            [_] => None,
        }
    }
}

/// A single AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Cell reference such as `A1` or `ZZ100`
    Reference(String),
    /// Verbatim whitespace run
    Whitespace(String),
    Operator(Operator),
    /// Function name typed without an argument list
    Partial(String),
    Function(Call),
}

impl Node {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Node::Whitespace(_))
    }

    /// Operands are everything except operators and whitespace
    pub fn is_operand(&self) -> bool {
        !matches!(self, Node::Whitespace(_) | Node::Operator(_))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Number(_) => NodeKind::Number,
            Node::Text(_) => NodeKind::Text,
            Node::Boolean(_) => NodeKind::Boolean,
            Node::Reference(_) => NodeKind::Reference,
            Node::Whitespace(_) => NodeKind::Whitespace,
            Node::Operator(_) => NodeKind::Operator,
            Node::Partial(_) => NodeKind::Partial,
            Node::Function(_) => NodeKind::Function,
        }
    }
}

/// Function call; the empty name is a parenthesised group
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `( ... )` without a function name
    pub fn is_group(&self) -> bool {
        self.name.is_empty()
    }

    /// Arguments that carry a value, skipping whitespace-only ones
    pub fn value_args(&self) -> impl Iterator<Item = &Expression> {
        self.args.iter().filter(|a| !a.is_whitespace_only())
    }
}

/// Node kind names, used as style tags by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeKind {
    Number,
    Text,
    Boolean,
    Reference,
    Whitespace,
    Operator,
    Partial,
    Function,
    Expression,
    Formula,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Number => "number",
            NodeKind::Text => "text",
            NodeKind::Boolean => "boolean",
            NodeKind::Reference => "reference",
            NodeKind::Whitespace => "whitespace",
            NodeKind::Operator => "operator",
            NodeKind::Partial => "partial",
            NodeKind::Function => "function",
            NodeKind::Expression => "expression",
            NodeKind::Formula => "formula",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural path from the formula body to a node.
///
/// Indices alternate between an item index inside an expression and an
/// argument index inside a call, so `[0, 1, 2]` is "item 0 (a call), its
/// argument 1, item 2 of that argument". Odd-length paths name nodes,
/// even-length paths name expressions; the empty path is the root.
pub type NodePath = Vec<usize>;

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Concat,
}

impl Operator {
    /// All operators, two-character symbols ahead of their one-character prefixes
    pub const ALL: [Operator; 9] = [
        Operator::GreaterEqual,
        Operator::LessEqual,
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Concat,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::Concat => "&",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Apply the operator to two evaluated operands
    pub fn apply(self, left: &Value, right: &Value) -> FormulaResult<Value> {
        // Zero denominators are reported before any type check.
        if self == Operator::Divide && right.as_number() == Some(0.0) {
            return Err(FormulaError::DivideByZero);
        }

        match self {
            Operator::Add => Ok(Value::Number(left.to_number()? + right.to_number()?)),
            Operator::Subtract => Ok(Value::Number(left.to_number()? - right.to_number()?)),
            Operator::Multiply => Ok(Value::Number(left.to_number()? * right.to_number()?)),
            Operator::Divide => Ok(Value::Number(left.to_number()? / right.to_number()?)),
            Operator::Concat => Ok(Value::Text(format!("{}{}", left, right))),
            Operator::GreaterThan
            | Operator::GreaterEqual
            | Operator::LessThan
            | Operator::LessEqual => {
                let ordering = compare_values(left, right)?;
                let result = match self {
                    Operator::GreaterThan => ordering.is_gt(),
                    Operator::GreaterEqual => ordering.is_ge(),
                    Operator::LessThan => ordering.is_lt(),
                    _ => ordering.is_le(),
                };
                Ok(Value::Boolean(result))
            }
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Same-type comparison; mixed types and NaN are invalid
fn compare_values(left: &Value, right: &Value) -> FormulaResult<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            l.partial_cmp(r).ok_or(FormulaError::InvalidOperation)
        }
        (Value::Text(l), Value::Text(r)) => Ok(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Ok(l.cmp(r)),
        _ => Err(FormulaError::InvalidOperation),
    }
}
