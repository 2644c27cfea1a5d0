//! Caret-context hints for the formula editor
//!
//! Given a parsed formula, its rendered offset table and a caret position,
//! work out which function the caret is inside and which argument it is on.

use crate::ast::{Ast, Call, Node};
use crate::functions::{ArgumentDescriptor, FunctionCatalog};
use crate::render::{Rendered, SegmentPart};

/// What to show the user about the caret position
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "hint", rename_all = "lowercase"))]
pub enum Hint {
    /// Caret on a function name
    Function {
        name: String,
        description: &'static str,
        overview: String,
    },
    /// Caret inside an argument
    Argument {
        /// Zero-based, whitespace-only arguments not counted
        number: usize,
        /// `None` past the end of a fixed argument list
        descriptor: Option<ArgumentDescriptor>,
        overview: String,
    },
    /// Caret on a separator or closing bracket
    Overview { overview: String },
}

impl Hint {
    /// Signature line of the enclosing function
    pub fn overview(&self) -> &str {
        match self {
            Hint::Function { overview, .. }
            | Hint::Argument { overview, .. }
            | Hint::Overview { overview } => overview,
        }
    }
}

/// Resolve a hint against the built-in catalog
///
/// The caret sits between characters and refers to the one before it. It is
/// counted in `rendered.text`, so when carets come from the text the user
/// typed, render with `RenderOptions { escape_markup: false }`. Escaping
/// lengthens strings holding `& < > " '` and shifts every offset after them.
///
/// ```rust
/// use cellscript_formula::{parse, render_with, resolve_hint, Hint, RenderOptions};
///
/// let ast = parse(r#"=join("<", "a")"#).unwrap();
/// let plain = render_with(&ast, &RenderOptions { escape_markup: false });
/// // Caret after the typed comma
/// assert!(matches!(resolve_hint(&ast, &plain, 10), Some(Hint::Overview { .. })));
/// ```
pub fn resolve_hint(ast: &Ast, rendered: &Rendered, caret: usize) -> Option<Hint> {
    resolve_hint_with(ast, rendered, caret, FunctionCatalog::builtin())
}

pub fn resolve_hint_with(
    ast: &Ast,
    rendered: &Rendered,
    caret: usize,
    catalog: &FunctionCatalog,
) -> Option<Hint> {
    ast.body()?;
    if rendered.failed || caret <= 1 {
        return None;
    }

    let segment = rendered.segment_at(caret - 1)?;
    match segment.part {
        SegmentPart::Equals => None,
        SegmentPart::Leaf => argument_hint(ast, &segment.path, catalog),
        SegmentPart::Opening | SegmentPart::Separator | SegmentPart::Closing => {
            let call = call_at(ast, &segment.path)?;
            if call.is_group() {
                // Brackets of a group belong to the argument holding the group
                return argument_hint(ast, &segment.path, catalog);
            }

            let def = catalog.get(&call.name)?;
            let overview = def.overview();
            Some(if segment.part == SegmentPart::Opening {
                Hint::Function {
                    name: call.name.clone(),
                    description: def.description,
                    overview,
                }
            } else {
                Hint::Overview { overview }
            })
        }
    }
}

fn call_at<'a>(ast: &'a Ast, path: &[usize]) -> Option<&'a Call> {
    match ast.node_at(path)? {
        Node::Function(call) => Some(call),
        _ => None,
    }
}

/// Hint for the node at `path`, climbing out of groups
fn argument_hint(ast: &Ast, path: &[usize], catalog: &FunctionCatalog) -> Option<Hint> {
    let mut path = path;
    loop {
        // Top-level nodes sit in no function
        if path.len() < 3 {
            return None;
        }

        let call_path = &path[..path.len() - 2];
        let arg_index = path[path.len() - 2];
        let call = call_at(ast, call_path)?;
        if call.is_group() {
            path = call_path;
            continue;
        }

        let def = catalog.get(&call.name)?;
        let number = call
            .args
            .iter()
            .take(arg_index)
            .filter(|arg| !arg.is_whitespace_only())
            .count();

        return Some(Hint::Argument {
            number,
            descriptor: def.arguments.get(number),
            overview: def.overview(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::render::{render, render_with, RenderOptions};
    use pretty_assertions::assert_eq;

    fn hint(input: &str, caret: usize) -> Option<Hint> {
        let ast = parse(input).unwrap();
        let rendered = render(&ast);
        resolve_hint(&ast, &rendered, caret)
    }

    fn argument(
        number: usize,
        descriptor: Option<ArgumentDescriptor>,
        overview: &str,
    ) -> Option<Hint> {
        Some(Hint::Argument {
            number,
            descriptor,
            overview: overview.to_string(),
        })
    }

    const TO_POWER: &str = "to_power(number, exponent)";

    #[test]
    fn test_function_name_hint() {
        assert_eq!(
            hint("=to_power(2, 3)", 2),
            Some(Hint::Function {
                name: "to_power".into(),
                description: "raise a number to a power",
                overview: TO_POWER.into(),
            })
        );
    }

    #[test]
    fn test_argument_hints() {
        let number = Some(ArgumentDescriptor::named("number"));
        let exponent = Some(ArgumentDescriptor::typed("exponent", "number"));

        assert_eq!(hint("=to_power(2, 3)", 11), argument(0, number, TO_POWER));
        // The space before an argument belongs to that argument
        assert_eq!(hint("=to_power(2, 3)", 13), argument(1, exponent, TO_POWER));
        assert_eq!(hint("=to_power(2, 3)", 14), argument(1, exponent, TO_POWER));
    }

    #[test]
    fn test_separator_and_closing_give_overview() {
        let overview = Some(Hint::Overview {
            overview: TO_POWER.into(),
        });
        assert_eq!(hint("=to_power(2, 3)", 12), overview);
        assert_eq!(hint("=to_power(2, 3)", 15), overview);
    }

    #[test]
    fn test_no_hint() {
        // At or before the `=`
        assert_eq!(hint("=to_power(2, 3)", 0), None);
        assert_eq!(hint("=to_power(2, 3)", 1), None);
        // Past the end
        assert_eq!(hint("=to_power(2, 3)", 16), None);
        // Outside any function
        assert_eq!(hint("=1 + 2", 3), None);
        assert_eq!(hint("=add", 3), None);
        // Not a formula
        assert_eq!(hint("\"text\"", 3), None);
        // Unknown function
        assert_eq!(hint("=nope(1)", 3), None);
        assert_eq!(hint("=nope(1)", 7), None);
    }

    #[test]
    fn test_groups_are_transparent() {
        let number = Some(ArgumentDescriptor::named("number"));
        let overview = "add(number, number, ...)";

        // =add(1, (2+3)): caret on the `2`, then on the group's `(`
        assert_eq!(hint("=add(1, (2+3))", 10), argument(1, number, overview));
        assert_eq!(hint("=add(1, (2+3))", 9), argument(1, number, overview));
        // A top-level group has no function around it
        assert_eq!(hint("=(1+2)", 3), None);
    }

    #[test]
    fn test_nested_function_is_innermost() {
        // =add(increment(1), 2): caret on the `1`
        assert_eq!(
            hint("=add(increment(1), 2)", 16),
            argument(0, Some(ArgumentDescriptor::named("number")), "increment(number)")
        );
        // On the inner name
        assert!(matches!(
            hint("=add(increment(1), 2)", 7),
            Some(Hint::Function { name, .. }) if name == "increment"
        ));
    }

    #[test]
    fn test_indexed_and_fixed_descriptors() {
        assert_eq!(
            hint(r#"=join("-", "a", "b")"#, 13),
            argument(1, Some(ArgumentDescriptor::named("text")), "join(separator, text, ...)")
        );
        assert_eq!(
            hint("=divide(1, 0, 5)", 15),
            argument(
                2,
                Some(ArgumentDescriptor::named("fallback (if dividing by 0)")),
                "divide(top, bottom, fallback (if dividing by 0))"
            )
        );
        // Past the end of a fixed list
        assert_eq!(
            hint("=increment(1, 2)", 15),
            argument(1, None, "increment(number)")
        );
    }

    #[test]
    fn test_carets_index_the_rendered_text() {
        let ast = parse(r#"=join("<", "a")"#).unwrap();
        let overview = "join(separator, text, ...)";
        let separator = Some(ArgumentDescriptor::typed("separator", "text"));

        // Typed text: caret 10 follows the comma
        let plain = render_with(&ast, &RenderOptions { escape_markup: false });
        assert_eq!(plain.text, r#"=join("<", "a")"#);
        assert_eq!(
            resolve_hint(&ast, &plain, 10),
            Some(Hint::Overview {
                overview: overview.into()
            })
        );

        // Escaped text: the same caret lands inside `&lt;`
        let escaped = render(&ast);
        assert_eq!(escaped.text, r#"=join("&lt;", "a")"#);
        assert_eq!(
            resolve_hint(&ast, &escaped, 10),
            argument(0, separator, overview)
        );
        assert_eq!(
            resolve_hint(&ast, &escaped, 13),
            Some(Hint::Overview {
                overview: overview.into()
            })
        );
    }

    #[test]
    fn test_failed_render() {
        let ast = parse("=add(1)").unwrap();
        let rendered = Rendered {
            failed: true,
            ..Rendered::default()
        };
        assert_eq!(resolve_hint(&ast, &rendered, 3), None);
    }

    #[test]
    fn test_hint_overview_accessor() {
        assert_eq!(
            hint("=if(true, 1, 2)", 3).unwrap().overview(),
            "if(test, value if true, value if false)"
        );
    }
}
