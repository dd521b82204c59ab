//! Expression parser - converts source strings to AST
//!
//! Recursive descent, following the sublanguage's precedence rules
//! (lowest to highest):
//! 1. conditional (`a if c else b`)
//! 2. or
//! 3. and
//! 4. not
//! 5. comparison / membership / identity (`< <= > >= == != in not-in is is-not`,
//!    chained comparisons desugar to `and`)
//! 6. additive (+, -)
//! 7. multiplicative (*, /, //, %)
//! 8. unary (+, -)
//! 9. power (**, right-associative)
//! 10. postfix (call, index, attribute)
//! 11. atom (literal, identifier, lambda, display, comprehension)

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};

/// Parser for filter/projection expressions
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 200;

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            recursion_depth: 0,
        }
    }

    /// Parse the entire expression (top-level entry point)
    pub fn parse(&mut self) -> Result<AstNode> {
        let expr = self.parse_expression()?;

        // Ensure we've consumed all input
        if self.current_token.token_type != TokenType::Eof {
            return Err(self.unexpected("end of input"));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn current_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    /// Expect a specific token type and advance past it
    fn expect(&mut self, token_type: TokenType) -> Result<Token> {
        if self.current_token.token_type == token_type {
            let token = std::mem::replace(&mut self.current_token, self.lexer.next_token());
            Ok(token)
        } else {
            Err(self.unexpected(&format!("{token_type:?}")))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = &self.current_token;
        let message = match token.token_type {
            TokenType::Eof => format!("expected {expected}, reached end of input"),
            TokenType::Error => token.value.clone(),
            _ => format!("expected {expected}, got `{}`", token.value),
        };
        Error::Parse {
            message,
            offset: token.position,
        }
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::Parse {
                message: format!("expression too deeply nested (max depth: {MAX_RECURSION_DEPTH})"),
                offset: self.current_token.position,
            });
        }
        Ok(())
    }

    /// Parse an expression (lowest precedence: the conditional)
    fn parse_expression(&mut self) -> Result<AstNode> {
        self.check_recursion_depth()?;
        let result = self.parse_ternary();
        self.recursion_depth -= 1;
        result
    }

    /// Conditional: `then 'if' condition 'else' otherwise`
    fn parse_ternary(&mut self) -> Result<AstNode> {
        let then = self.parse_or()?;

        if self.current_is(TokenType::If) {
            self.advance();
            let condition = self.parse_or()?;
            self.expect(TokenType::Else)?;
            let otherwise = self.parse_expression()?;
            return Ok(AstNode::Ternary {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }

        Ok(then)
    }

    fn parse_or(&mut self) -> Result<AstNode> {
        let mut left = self.parse_and()?;

        while self.current_is(TokenType::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = AstNode::BoolOp {
                op: BoolOpKind::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<AstNode> {
        let mut left = self.parse_not()?;

        while self.current_is(TokenType::And) {
            self.advance();
            let right = self.parse_not()?;
            left = AstNode::BoolOp {
                op: BoolOpKind::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<AstNode> {
        if self.current_is(TokenType::Not) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(AstNode::Not {
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    /// The comparison operator at the current position, if any. Handles the
    /// two-token forms `not in` and `is not`.
    fn comparison_op(&mut self) -> Result<Option<BinaryOp>> {
        let op = match self.current_token.token_type {
            TokenType::LessThan => BinaryOp::Lt,
            TokenType::LessThanOrEqual => BinaryOp::Le,
            TokenType::GreaterThan => BinaryOp::Gt,
            TokenType::GreaterThanOrEqual => BinaryOp::Ge,
            TokenType::Equal => BinaryOp::Eq,
            TokenType::NotEqual => BinaryOp::Ne,
            TokenType::In => BinaryOp::In,
            TokenType::Not => {
                // only `not in` is valid in operator position
                self.advance();
                self.expect(TokenType::In)?;
                return Ok(Some(BinaryOp::NotIn));
            }
            TokenType::Is => {
                self.advance();
                if self.current_is(TokenType::Not) {
                    self.advance();
                    return Ok(Some(BinaryOp::IsNot));
                }
                return Ok(Some(BinaryOp::Is));
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(op))
    }

    /// Comparison chain: `a < b <= c` desugars to `a < b and b <= c`
    fn parse_comparison(&mut self) -> Result<AstNode> {
        let first = self.parse_additive()?;

        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let Some(op) = self.comparison_op()? {
            ops.push(op);
            operands.push(self.parse_additive()?);
        }

        if ops.is_empty() {
            return Ok(operands.pop().unwrap_or(AstNode::None));
        }

        let mut chain: Option<AstNode> = None;
        for (i, op) in ops.into_iter().enumerate() {
            let link = AstNode::Binary {
                left: Box::new(operands[i].clone()),
                op,
                right: Box::new(operands[i + 1].clone()),
            };
            chain = Some(match chain {
                None => link,
                Some(prev) => AstNode::BoolOp {
                    op: BoolOpKind::And,
                    left: Box::new(prev),
                    right: Box::new(link),
                },
            });
        }
        Ok(chain.unwrap_or(AstNode::None))
    }

    fn parse_additive(&mut self) -> Result<AstNode> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token.token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = AstNode::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<AstNode> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token.token_type {
                TokenType::Star => BinaryOp::Mul,
                TokenType::Slash => BinaryOp::Div,
                TokenType::DoubleSlash => BinaryOp::FloorDiv,
                TokenType::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = AstNode::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<AstNode> {
        let op = match self.current_token.token_type {
            TokenType::Plus => UnaryOp::Plus,
            TokenType::Minus => UnaryOp::Minus,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(AstNode::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Power is right-associative and binds tighter than unary on the right:
    /// `-2 ** 2 == -(2 ** 2)`, `2 ** -1` is valid
    fn parse_power(&mut self) -> Result<AstNode> {
        let base = self.parse_postfix()?;

        if self.current_is(TokenType::DoubleStar) {
            self.advance();
            let exponent = self.parse_unary()?;
            return Ok(AstNode::Binary {
                left: Box::new(base),
                op: BinaryOp::Pow,
                right: Box::new(exponent),
            });
        }

        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<AstNode> {
        self.check_recursion_depth()?;
        let mut expr = self.parse_atom()?;

        loop {
            match self.current_token.token_type {
                TokenType::OpenParen => {
                    let offset = self.current_token.position;
                    self.advance();
                    let args = self.parse_call_args()?;
                    expr = AstNode::Call {
                        callee: Box::new(expr),
                        args,
                        offset,
                    };
                }
                TokenType::OpenBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenType::CloseBracket)?;
                    expr = AstNode::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenType::Dot => {
                    self.advance();
                    let name = self.expect(TokenType::Identifier)?;
                    expr = AstNode::Attribute {
                        object: Box::new(expr),
                        name: name.value,
                        offset: name.position,
                    };
                }
                _ => break,
            }
        }

        self.recursion_depth -= 1;
        Ok(expr)
    }

    /// Call arguments, including the bare generator form `any(x for x in xs)`
    fn parse_call_args(&mut self) -> Result<Vec<AstNode>> {
        if self.current_is(TokenType::CloseParen) {
            self.advance();
            return Ok(Vec::new());
        }

        let first = self.parse_expression()?;
        if self.current_is(TokenType::For) {
            self.advance();
            let comprehension = self.parse_comprehension_tail(first)?;
            self.expect(TokenType::CloseParen)?;
            return Ok(vec![comprehension]);
        }

        let mut args = vec![first];
        while self.current_is(TokenType::Comma) {
            self.advance();
            if self.current_is(TokenType::CloseParen) {
                break; // trailing comma
            }
            args.push(self.parse_expression()?);
        }
        self.expect(TokenType::CloseParen)?;
        Ok(args)
    }

    /// The `for var in iterable [if condition]` part of a comprehension,
    /// with `for` already consumed
    fn parse_comprehension_tail(&mut self, element: AstNode) -> Result<AstNode> {
        let var = self.expect(TokenType::Identifier)?;
        self.expect(TokenType::In)?;
        let iterable = self.parse_or()?;
        let condition = if self.current_is(TokenType::If) {
            self.advance();
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        Ok(AstNode::Comprehension {
            element: Box::new(element),
            var: var.value,
            iterable: Box::new(iterable),
            condition,
        })
    }

    fn parse_atom(&mut self) -> Result<AstNode> {
        let token = self.current_token.clone();
        match token.token_type {
            TokenType::IntLiteral => {
                self.advance();
                let value: i64 = token.value.parse().map_err(|_| Error::Parse {
                    message: format!("integer literal out of range: {}", token.value),
                    offset: token.position,
                })?;
                Ok(AstNode::Int(value))
            }
            TokenType::FloatLiteral => {
                self.advance();
                let value: f32 = token.value.parse().map_err(|_| Error::Parse {
                    message: format!("invalid float literal: {}", token.value),
                    offset: token.position,
                })?;
                Ok(AstNode::Float(value as f64))
            }
            TokenType::StringLiteral => {
                self.advance();
                Ok(AstNode::Str(token.value))
            }
            TokenType::True => {
                self.advance();
                Ok(AstNode::Bool(true))
            }
            TokenType::False => {
                self.advance();
                Ok(AstNode::Bool(false))
            }
            TokenType::None => {
                self.advance();
                Ok(AstNode::None)
            }
            TokenType::Na => {
                self.advance();
                Ok(AstNode::Na)
            }
            TokenType::Identifier => {
                self.advance();
                Ok(AstNode::Identifier {
                    name: token.value,
                    offset: token.position,
                })
            }
            TokenType::Lambda => {
                self.advance();
                let param = self.expect(TokenType::Identifier)?;
                self.expect(TokenType::Colon)?;
                let body = self.parse_expression()?;
                Ok(AstNode::Lambda {
                    param: param.value,
                    body: Box::new(body),
                })
            }
            TokenType::OpenParen => self.parse_paren(),
            TokenType::OpenBracket => self.parse_list(),
            TokenType::OpenBrace => self.parse_braces(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Parenthesized expression, tuple display, or generator
    fn parse_paren(&mut self) -> Result<AstNode> {
        self.advance(); // (
        if self.current_is(TokenType::CloseParen) {
            self.advance();
            return Ok(AstNode::Tuple(Vec::new()));
        }

        let first = self.parse_expression()?;

        if self.current_is(TokenType::For) {
            self.advance();
            let comprehension = self.parse_comprehension_tail(first)?;
            self.expect(TokenType::CloseParen)?;
            return Ok(comprehension);
        }

        if self.current_is(TokenType::Comma) {
            let mut items = vec![first];
            while self.current_is(TokenType::Comma) {
                self.advance();
                if self.current_is(TokenType::CloseParen) {
                    break;
                }
                items.push(self.parse_expression()?);
            }
            self.expect(TokenType::CloseParen)?;
            return Ok(AstNode::Tuple(items));
        }

        self.expect(TokenType::CloseParen)?;
        Ok(first)
    }

    /// List display or list comprehension
    fn parse_list(&mut self) -> Result<AstNode> {
        self.advance(); // [
        if self.current_is(TokenType::CloseBracket) {
            self.advance();
            return Ok(AstNode::List(Vec::new()));
        }

        let first = self.parse_expression()?;

        if self.current_is(TokenType::For) {
            self.advance();
            let comprehension = self.parse_comprehension_tail(first)?;
            self.expect(TokenType::CloseBracket)?;
            return Ok(comprehension);
        }

        let mut items = vec![first];
        while self.current_is(TokenType::Comma) {
            self.advance();
            if self.current_is(TokenType::CloseBracket) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(TokenType::CloseBracket)?;
        Ok(AstNode::List(items))
    }

    /// Set or dict display (`{}` is an empty dict)
    fn parse_braces(&mut self) -> Result<AstNode> {
        self.advance(); // {
        if self.current_is(TokenType::CloseBrace) {
            self.advance();
            return Ok(AstNode::Dict(Vec::new()));
        }

        let first = self.parse_expression()?;

        if self.current_is(TokenType::Colon) {
            self.advance();
            let value = self.parse_expression()?;
            let mut pairs = vec![(first, value)];
            while self.current_is(TokenType::Comma) {
                self.advance();
                if self.current_is(TokenType::CloseBrace) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect(TokenType::Colon)?;
                let value = self.parse_expression()?;
                pairs.push((key, value));
            }
            self.expect(TokenType::CloseBrace)?;
            return Ok(AstNode::Dict(pairs));
        }

        let mut items = vec![first];
        while self.current_is(TokenType::Comma) {
            self.advance();
            if self.current_is(TokenType::CloseBrace) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(TokenType::CloseBrace)?;
        Ok(AstNode::Set(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<AstNode> {
        Parser::new(input).parse()
    }

    #[test]
    fn parses_simple_predicates() {
        assert!(parse("QUAL >= 30").is_ok());
        assert!(parse("CHROM == 'chr2' and POS > 100").is_ok());
        assert!(parse("'pathogenic' in INFO['CLNSIG']").is_ok());
    }

    #[test]
    fn float_literals_are_narrowed_to_f32() {
        let node = parse("0.6").unwrap();
        assert_eq!(node, AstNode::Float(0.6f32 as f64));
    }

    #[test]
    fn chained_comparison_desugars_to_and() {
        let node = parse("1 < POS < 10").unwrap();
        assert!(matches!(
            node,
            AstNode::BoolOp {
                op: BoolOpKind::And,
                ..
            }
        ));
    }

    #[test]
    fn not_in_and_is_not() {
        assert!(matches!(
            parse("x not in y").unwrap(),
            AstNode::Binary { op: BinaryOp::NotIn, .. }
        ));
        assert!(matches!(
            parse("ID is not NA").unwrap(),
            AstNode::Binary { op: BinaryOp::IsNot, .. }
        ));
    }

    #[test]
    fn power_is_right_associative() {
        let node = parse("2 ** 3 ** 2").unwrap();
        let AstNode::Binary { right, .. } = node else {
            panic!("expected power expression");
        };
        assert!(matches!(*right, AstNode::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let node = parse("-2 ** 2").unwrap();
        assert!(matches!(node, AstNode::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn parses_comprehensions_and_generators() {
        assert!(matches!(
            parse("[x for x in xs if x > 0]").unwrap(),
            AstNode::Comprehension { condition: Some(_), .. }
        ));
        let AstNode::Call { args, .. } = parse("any(c == 'x' for c in cs)").unwrap() else {
            panic!("expected call");
        };
        assert!(matches!(args[0], AstNode::Comprehension { .. }));
    }

    #[test]
    fn parses_lambda_and_postfix_chains() {
        assert!(parse("lambda s: FORMAT['DP'][s] > 10").is_ok());
        assert!(parse("ANN['Consequence'].any_is_a('coding_variant')").is_ok());
        assert!(parse("INFO['cosmic'].get('id', NA)").is_ok());
    }

    #[test]
    fn parses_displays() {
        assert!(matches!(parse("(1, 2)").unwrap(), AstNode::Tuple(_)));
        assert!(matches!(parse("(1,)").unwrap(), AstNode::Tuple(items) if items.len() == 1));
        assert!(matches!(parse("{'HIGH', 'MODERATE'}").unwrap(), AstNode::Set(_)));
        assert!(matches!(parse("{'a': 1}").unwrap(), AstNode::Dict(_)));
        assert!(matches!(parse("{}").unwrap(), AstNode::Dict(pairs) if pairs.is_empty()));
    }

    #[test]
    fn ternary_expression() {
        assert!(matches!(
            parse("QUAL if QUAL is not NA else 0").unwrap(),
            AstNode::Ternary { .. }
        ));
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(parse("QUAL >=").is_err());
        assert!(parse("QUAL >= 30)").is_err());
        assert!(parse("[1, 2").is_err());
        assert!(parse("lambda: x").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_deep_nesting() {
        let source = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert!(parse(&source).is_err());
    }
}
