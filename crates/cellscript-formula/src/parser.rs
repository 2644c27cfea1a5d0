//! Formula parser
//!
//! A scannerless recursive descent parser. There is no operator precedence:
//! an expression is parsed into a flat, alternating run of operands and
//! operators with the whitespace between them kept verbatim.

use crate::ast::{Ast, Call, Expression, Node, Operator};
use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;

/// Parser settings
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum nesting of calls and parenthesised groups (default: 64)
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Parse cell input into an AST
///
/// # Example
/// ```rust
/// use cellscript_formula::{parse, Ast};
///
/// assert_eq!(parse("").unwrap(), Ast::Empty);
/// assert!(parse("=1+2").is_ok());
/// assert!(parse("=increment(add(2, A1))").is_ok());
/// assert!(parse("=1+").is_err());
/// ```
pub fn parse(input: &str) -> FormulaResult<Ast> {
    parse_with(input, &ParseOptions::default())
}

/// Parse with explicit options
pub fn parse_with(input: &str, options: &ParseOptions) -> FormulaResult<Ast> {
    let result = FormulaParser::new(input, options).parse_input();
    if let Err(FormulaError::Syntax { offset, reason }) = &result {
        tracing::debug!(offset, %reason, input, "rejected cell input");
    }
    result
}

/// Characters allowed in function names
fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_'
}

struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    fn parse_input(mut self) -> FormulaResult<Ast> {
        match self.input {
            "" => return Ok(Ast::Empty),
            "=" => return Ok(Ast::Formula(Expression::default())),
            _ => {}
        }

        let ast = if self.eat('=') {
            Ast::Formula(self.parse_expression()?)
        } else {
            Ast::Primitive(self.parse_primitive()?)
        };

        // Make sure we consumed all input
        if let Some(c) = self.peek_char() {
            return Err(self.error(format!("unexpected '{}'", c)));
        }

        Ok(ast)
    }

    // === Grammar ===

    /// A bare literal: the only thing allowed without a leading `=`
    fn parse_primitive(&mut self) -> FormulaResult<Value> {
        match self.peek_char() {
            Some('"') => self.scan_string().map(Value::Text),
            Some(c) if c == '-' || c.is_ascii_digit() => self.scan_number().map(Value::Number),
            Some(c) if is_name_char(c) => match self.scan_name() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(self.error("expected a number, string or boolean")),
            },
            _ => Err(self.error("expected a number, string or boolean")),
        }
    }

    /// `(ws? operand ws? (operator ws? operand ws?)*)`
    fn parse_expression(&mut self) -> FormulaResult<Expression> {
        let mut items = Vec::new();
        let mut expect_operand = true;

        loop {
            if let Some(ws) = self.scan_whitespace() {
                items.push(Node::Whitespace(ws));
            }

            if expect_operand {
                items.push(self.parse_operand()?);
                expect_operand = false;
            } else if let Some(op) = self.scan_operator() {
                items.push(Node::Operator(op));
                expect_operand = true;
            } else {
                break;
            }
        }

        Ok(Expression::new(items))
    }

    fn parse_operand(&mut self) -> FormulaResult<Node> {
        match self.peek_char() {
            Some('"') => self.scan_string().map(Node::Text),
            Some(c) if c.is_ascii_digit() => self.scan_number().map(Node::Number),
            // In operand position a minus directly before a digit is a sign
            Some('-') if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number().map(Node::Number)
            }
            Some(c) if c.is_ascii_uppercase() => self.scan_reference().map(Node::Reference),
            Some(c) if is_name_char(c) || c == '(' => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected '{}'", c))),
            None => Err(self.error("expected a value")),
        }
    }

    /// Function call, group, boolean, or partial function name
    fn parse_word(&mut self) -> FormulaResult<Node> {
        let name = self.scan_name().to_string();

        if self.peek_char() == Some('(') {
            return self.parse_call(name).map(Node::Function);
        }

        match name.as_str() {
            "true" => return Ok(Node::Boolean(true)),
            "false" => return Ok(Node::Boolean(false)),
            "" => return Err(self.error("expected a value")),
            _ => {}
        }

        Ok(Node::Partial(name))
    }

    fn parse_call(&mut self, name: String) -> FormulaResult<Call> {
        let open = self.pos;
        self.advance(); // Skip '('

        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error_at(open, "nesting too deep"));
        }

        let mut args = Vec::new();
        loop {
            let leading = self.scan_whitespace();

            // `name()` and `name( )`
            if args.is_empty() && self.peek_char() == Some(')') {
                args.extend(leading.map(Expression::whitespace));
                break;
            }

            args.extend(leading.map(Expression::whitespace));
            args.push(self.parse_expression()?);

            match self.peek_char() {
                Some(',') => self.advance(),
                Some(')') => break,
                Some(c) => return Err(self.error(format!("unexpected '{}' in arguments", c))),
                None => return Err(self.error("unclosed '('")),
            }
        }

        self.advance(); // Skip ')'
        self.depth -= 1;

        let call = Call::new(name, args);
        if call.is_group() && call.value_args().count() != 1 {
            return Err(self.error_at(open, "parentheses must hold exactly one expression"));
        }

        Ok(call)
    }

    // === Token scanning ===

    fn scan_whitespace(&mut self) -> Option<String> {
        let ws = self.take_while(char::is_whitespace);
        (!ws.is_empty()).then(|| ws.to_string())
    }

    fn scan_name(&mut self) -> &'a str {
        self.take_while(is_name_char)
    }

    /// `"..."`, non-greedy, no escapes
    fn scan_string(&mut self) -> FormulaResult<String> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let rest = &self.input[self.pos..];
        match rest.find('"') {
            Some(len) => {
                let value = rest[..len].to_string();
                self.pos += len + 1;
                Ok(value)
            }
            None => Err(self.error_at(start, "unterminated string")),
        }
    }

    /// `-?digits(.digits)?`
    fn scan_number(&mut self) -> FormulaResult<f64> {
        let start = self.pos;

        self.eat('-');
        self.take_while(|c| c.is_ascii_digit());

        // Decimal part
        if self.peek_char() == Some('.') && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        let num_str = &self.input[start..self.pos];
        let n: f64 = num_str
            .parse()
            .map_err(|_| self.error_at(start, format!("invalid number '{}'", num_str)))?;
        // Too many digits for f64; nothing could render it back
        if !n.is_finite() {
            return Err(self.error_at(start, "number out of range"));
        }
        Ok(n)
    }

    /// `[A-Z]+[0-9]+`
    fn scan_reference(&mut self) -> FormulaResult<String> {
        let start = self.pos;

        let column = self.take_while(|c| c.is_ascii_uppercase());
        let row = self.take_while(|c| c.is_ascii_digit());
        if row.is_empty() {
            return Err(self.error(format!("expected a row number after '{}'", column)));
        }

        Ok(self.input[start..self.pos].to_string())
    }

    fn scan_operator(&mut self) -> Option<Operator> {
        let rest = &self.input[self.pos..];
        let op = Operator::ALL
            .into_iter()
            .find(|op| rest.starts_with(op.symbol()))?;
        self.pos += op.symbol().len();
        Some(op)
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self.peek_char().is_some_and(&pred) {
            self.advance();
        }
        &input[start..self.pos]
    }

    fn error(&self, reason: impl Into<String>) -> FormulaError {
        self.error_at(self.pos, reason)
    }

    /// Syntax error at a byte position, reported as a char offset
    fn error_at(&self, pos: usize, reason: impl Into<String>) -> FormulaError {
        FormulaError::syntax(self.input[..pos].chars().count(), reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formula(items: Vec<Node>) -> Ast {
        Ast::Formula(Expression::new(items))
    }

    fn expr(items: Vec<Node>) -> Expression {
        Expression::new(items)
    }

    fn call(name: &str, args: Vec<Expression>) -> Node {
        Node::Function(Call::new(name, args))
    }

    fn ws(text: &str) -> Node {
        Node::Whitespace(text.into())
    }

    fn op(symbol: &str) -> Node {
        Node::Operator(Operator::from_symbol(symbol).unwrap())
    }

    fn syntax_offset(input: &str) -> usize {
        match parse(input) {
            Err(FormulaError::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_parse_degenerate_inputs() {
        assert_eq!(parse("").unwrap(), Ast::Empty);
        assert_eq!(parse("=").unwrap(), formula(vec![]));
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse("3").unwrap(), Ast::Primitive(Value::Number(3.0)));
        assert_eq!(parse("123").unwrap(), Ast::Primitive(Value::Number(123.0)));
        assert_eq!(parse("-2.5").unwrap(), Ast::Primitive(Value::Number(-2.5)));
        assert_eq!(parse("\"str\"").unwrap(), Ast::Primitive(Value::Text("str".into())));
        assert_eq!(
            parse("\"multiple words\"").unwrap(),
            Ast::Primitive(Value::Text("multiple words".into()))
        );
        assert_eq!(parse("true").unwrap(), Ast::Primitive(Value::Boolean(true)));
        assert_eq!(parse("false").unwrap(), Ast::Primitive(Value::Boolean(false)));
    }

    #[test]
    fn test_bare_non_primitives_rejected() {
        assert!(parse("B3").is_err());
        assert!(parse("add").is_err());
        assert!(parse(" 3").is_err());
        assert!(parse("3 ").is_err());
        assert!(parse("1+2").is_err());
    }

    #[test]
    fn test_parse_number_formula() {
        assert_eq!(parse("=7").unwrap(), formula(vec![Node::Number(7.0)]));
    }

    #[test]
    fn test_parse_basic_expression() {
        assert_eq!(
            parse("=1+2").unwrap(),
            formula(vec![Node::Number(1.0), op("+"), Node::Number(2.0)])
        );
    }

    #[test]
    fn test_parse_expression_with_spaces() {
        assert_eq!(
            parse("=3 + 6").unwrap(),
            formula(vec![
                Node::Number(3.0),
                ws(" "),
                op("+"),
                ws(" "),
                Node::Number(6.0),
            ])
        );
    }

    #[test]
    fn test_parse_two_character_operators() {
        assert_eq!(
            parse("=1>=2").unwrap(),
            formula(vec![Node::Number(1.0), op(">="), Node::Number(2.0)])
        );
        assert_eq!(
            parse("=1<2").unwrap(),
            formula(vec![Node::Number(1.0), op("<"), Node::Number(2.0)])
        );
    }

    #[test]
    fn test_parse_minus_sign_vs_operator() {
        assert_eq!(
            parse("=1-2").unwrap(),
            formula(vec![Node::Number(1.0), op("-"), Node::Number(2.0)])
        );
        assert_eq!(
            parse("=1--2").unwrap(),
            formula(vec![Node::Number(1.0), op("-"), Node::Number(-2.0)])
        );
        assert_eq!(parse("=-3").unwrap(), formula(vec![Node::Number(-3.0)]));
    }

    #[test]
    fn test_parse_brackets() {
        assert_eq!(
            parse("=(3+4)").unwrap(),
            formula(vec![call(
                "",
                vec![expr(vec![Node::Number(3.0), op("+"), Node::Number(4.0)])]
            )])
        );
    }

    #[test]
    fn test_parse_function() {
        assert_eq!(
            parse("=increment(4)").unwrap(),
            formula(vec![call("increment", vec![expr(vec![Node::Number(4.0)])])])
        );
    }

    #[test]
    fn test_parse_function_after_space() {
        assert_eq!(
            parse("= increment(4)").unwrap(),
            formula(vec![
                ws(" "),
                call("increment", vec![expr(vec![Node::Number(4.0)])])
            ])
        );
    }

    #[test]
    fn test_parse_argument_order() {
        let ast = parse(r#"=join("a","b","c","d","e")"#).unwrap();
        let args = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| expr(vec![Node::Text(s.to_string())]))
            .collect();
        assert_eq!(ast, formula(vec![call("join", args)]));
    }

    #[test]
    fn test_parse_function_with_spaces() {
        assert_eq!(
            parse("=add(2, 3)").unwrap(),
            formula(vec![call(
                "add",
                vec![
                    expr(vec![Node::Number(2.0)]),
                    Expression::whitespace(" "),
                    expr(vec![Node::Number(3.0)]),
                ]
            )])
        );
    }

    #[test]
    fn test_whitespace_before_comma_stays_in_argument() {
        assert_eq!(
            parse("=add(5 , 1)").unwrap(),
            formula(vec![call(
                "add",
                vec![
                    expr(vec![Node::Number(5.0), ws(" ")]),
                    Expression::whitespace(" "),
                    expr(vec![Node::Number(1.0)]),
                ]
            )])
        );
    }

    #[test]
    fn test_parse_empty_argument_list() {
        assert_eq!(parse("=add()").unwrap(), formula(vec![call("add", vec![])]));
        assert_eq!(
            parse("=add( )").unwrap(),
            formula(vec![call("add", vec![Expression::whitespace(" ")])])
        );
    }

    #[test]
    fn test_parse_partial_function() {
        assert_eq!(parse("=add").unwrap(), formula(vec![Node::Partial("add".into())]));
        assert_eq!(
            parse("=1 + to_pow").unwrap(),
            formula(vec![
                Node::Number(1.0),
                ws(" "),
                op("+"),
                ws(" "),
                Node::Partial("to_pow".into()),
            ])
        );
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse("=A1").unwrap(), formula(vec![Node::Reference("A1".into())]));
        assert_eq!(
            parse("=5 + A1").unwrap(),
            formula(vec![
                Node::Number(5.0),
                ws(" "),
                op("+"),
                ws(" "),
                Node::Reference("A1".into()),
            ])
        );
        assert_eq!(
            parse("=ZZ100").unwrap(),
            formula(vec![Node::Reference("ZZ100".into())])
        );
    }

    #[test]
    fn test_parse_booleans_in_formula() {
        assert_eq!(
            parse("=if(true, 1, 2)").unwrap(),
            formula(vec![call(
                "if",
                vec![
                    expr(vec![Node::Boolean(true)]),
                    Expression::whitespace(" "),
                    expr(vec![Node::Number(1.0)]),
                    Expression::whitespace(" "),
                    expr(vec![Node::Number(2.0)]),
                ]
            )])
        );
        // Longest match: not a boolean followed by junk
        assert_eq!(parse("=trueish").unwrap(), formula(vec![Node::Partial("trueish".into())]));
    }

    #[test]
    fn test_parse_nested() {
        let ast = parse("=increment(add(increment(1), 3))").unwrap();
        let inner = call("increment", vec![expr(vec![Node::Number(1.0)])]);
        let add = call(
            "add",
            vec![
                expr(vec![inner]),
                Expression::whitespace(" "),
                expr(vec![Node::Number(3.0)]),
            ],
        );
        assert_eq!(ast, formula(vec![call("increment", vec![expr(vec![add])])]));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(syntax_offset("=#"), 1);
        assert_eq!(syntax_offset("=1+"), 3);
        assert_eq!(syntax_offset("=1 2"), 3);
        assert_eq!(syntax_offset("=+1"), 1);
        assert_eq!(syntax_offset("=add(1,)"), 7);
        assert_eq!(syntax_offset("=add(1"), 6);
        assert_eq!(syntax_offset("=\"open"), 1);
        assert_eq!(syntax_offset("=A"), 2);
        assert_eq!(syntax_offset("=a1"), 2);
        assert_eq!(syntax_offset("=ADD(1)"), 4);
        assert_eq!(syntax_offset("= "), 2);
        assert_eq!(syntax_offset("=1."), 2);
    }

    #[test]
    fn test_number_out_of_range() {
        let huge = "9".repeat(400);
        assert_eq!(syntax_offset(&format!("={}", huge)), 1);
        assert_eq!(syntax_offset(&format!("=1 + -{}", huge)), 5);
        assert_eq!(syntax_offset(&huge), 0);

        // Long but finite runs still parse
        let long = "9".repeat(300);
        assert!(parse(&format!("={}", long)).is_ok());
    }

    #[test]
    fn test_group_arity_enforced() {
        assert_eq!(syntax_offset("=()"), 1);
        assert_eq!(syntax_offset("=(1, 2)"), 1);
        assert!(parse("=( 1 )").is_ok());
    }

    #[test]
    fn test_syntax_error_message() {
        assert_eq!(parse("=#").unwrap_err().to_string(), "syntax");
    }

    #[test]
    fn test_offsets_count_chars() {
        // The string holds a two-byte char; the offset is in chars.
        assert_eq!(syntax_offset("=\"é\" +"), 6);
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions { max_depth: 3 };
        assert!(parse_with("=(((1)))", &options).is_ok());
        assert!(parse_with("=((((1))))", &options).is_err());

        let deep = format!("={}1{}", "(".repeat(500), ")".repeat(500));
        assert!(parse(&deep).is_err());
    }
}
