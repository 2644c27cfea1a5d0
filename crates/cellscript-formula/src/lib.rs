//! # cellscript-formula
//!
//! Formula language for a spreadsheet cell editor.
//!
//! This crate provides:
//! - Parsing cell input into a whitespace-preserving AST (text → AST)
//! - Evaluation against a snapshot of other cells' results (AST → value)
//! - Canonical rendering with a char offset table for styling
//! - Caret hints naming the function and argument under the cursor
//! - The built-in function catalog
//!
//! ## Example
//!
//! ```rust
//! use cellscript_formula::{
//!     evaluate, parse, render, resolve_hint, EvaluationContext, FormulaResult, Value,
//! };
//! use std::collections::HashMap;
//!
//! let refs: HashMap<String, FormulaResult<Value>> =
//!     HashMap::from([("A1".to_string(), Ok(Value::Number(5.0)))]);
//! let ast = parse("=add(A1, 2)").unwrap();
//!
//! let value = evaluate(&ast, &EvaluationContext::new(&refs)).unwrap();
//! assert_eq!(value, Value::Number(7.0));
//!
//! let rendered = render(&ast);
//! assert_eq!(rendered.text, "=add(A1, 2)");
//! let hint = resolve_hint(&ast, &rendered, 3).unwrap();
//! assert_eq!(hint.overview(), "add(number, number, ...)");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod hints;
pub mod parser;
pub mod render;
pub mod value;

pub use ast::{Ast, Call, Expression, Node, NodeKind, NodePath, Operator};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluateOptions, EvaluationContext, ReferenceLookup};
pub use functions::{ArgumentDescriptor, Arguments, Arity, FunctionCatalog, FunctionDef};
pub use hints::{resolve_hint, resolve_hint_with, Hint};
pub use parser::{parse, parse_with, ParseOptions};
pub use render::{render, render_with, RenderOptions, Rendered, Segment, SegmentPart};
pub use value::{CellReport, Value};
