//! Recursive-descent parser for textual dialect queries.

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source text.
    pub fn new(input: &str) -> ParseResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        // The token stream always ends with EOF.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(ParseError::unexpected_token(
                token.span,
                kind.name(),
                token.kind.name(),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => {
                let token = self.peek();
                Err(ParseError::unexpected_token(
                    token.span,
                    "identifier",
                    token.kind.name(),
                ))
            }
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Str(value) => {
                self.advance();
                Ok(value)
            }
            _ => {
                let token = self.peek();
                Err(ParseError::unexpected_token(
                    token.span,
                    "string",
                    token.kind.name(),
                ))
            }
        }
    }

    /// Parse a full `MATCH ... WHERE ...` query.
    pub fn parse_query(&mut self) -> ParseResult<QueryAst> {
        self.expect(&TokenKind::Match)?;
        let path = self.parse_path()?;
        self.expect(&TokenKind::Where)?;
        let conditions = self.parse_conditions()?;

        let token = self.peek();
        if !matches!(token.kind, TokenKind::Eof) {
            return Err(ParseError::unexpected_token(
                token.span,
                "end of input",
                token.kind.name(),
            ));
        }
        Ok(QueryAst { path, conditions })
    }

    // ==================== PATH ====================

    fn parse_path(&mut self) -> ParseResult<Vec<NodeRef>> {
        let mut nodes = vec![self.parse_node_ref()?];
        while self.eat(&TokenKind::RightArrow) {
            nodes.push(self.parse_node_ref()?);
        }
        Ok(nodes)
    }

    /// `( quant , name )` | `( quant )` | `( name )`
    fn parse_node_ref(&mut self) -> ParseResult<NodeRef> {
        let open = self.expect(&TokenKind::LParen)?;

        let mut quant = None;
        let mut name = None;
        match self.peek().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                quant = Some(QuantToken::Int(n));
            }
            TokenKind::Str(s) => {
                self.advance();
                quant = Some(QuantToken::Str(s));
            }
            TokenKind::Ident(id) => {
                self.advance();
                name = Some(id);
            }
            _ => {
                let token = self.peek();
                return Err(ParseError::unexpected_token(
                    token.span,
                    "quantifier or binding name",
                    token.kind.name(),
                ));
            }
        }

        if quant.is_some() && self.eat(&TokenKind::Comma) {
            name = Some(self.expect_ident()?);
        }

        let close = self.expect(&TokenKind::RParen)?;
        Ok(NodeRef {
            quant,
            name,
            span: Span::new(open.span.start, close.span.end, open.span.line, open.span.column),
        })
    }

    // ==================== CONDITIONS ====================

    fn parse_conditions(&mut self) -> ParseResult<Vec<Condition>> {
        let mut conditions = vec![self.parse_condition(Connector::First)?];
        loop {
            let connector = match self.peek().kind {
                TokenKind::And => Connector::And,
                TokenKind::Or => Connector::Or,
                _ => break,
            };
            self.advance();
            conditions.push(self.parse_condition(connector)?);
        }
        Ok(conditions)
    }

    fn parse_condition(&mut self, connector: Connector) -> ParseResult<Condition> {
        let start = self.peek().span;
        let negated = self.eat(&TokenKind::Not);
        let kind = self.parse_single_condition()?;
        let end = if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            start
        };
        Ok(Condition {
            connector,
            negated,
            kind,
            span: Span::new(start.start, end.end, start.line, start.column),
        })
    }

    fn parse_single_condition(&mut self) -> ParseResult<ConditionKind> {
        let name = self.expect_ident()?;

        // `name IS [NOT] LEAF`
        if self.check(&TokenKind::Is) {
            self.advance();
            let negated = self.eat(&TokenKind::Not);
            self.expect(&TokenKind::Leaf)?;
            return Ok(ConditionKind::IsLeaf { name, negated });
        }

        self.expect(&TokenKind::Dot)?;
        let metric = self.expect_string()?;

        // `name."metric" IS [NOT] (NONE | NAN | INF)`
        if self.eat(&TokenKind::Is) {
            let negated = self.eat(&TokenKind::Not);
            let token = self.advance();
            return match token.kind {
                TokenKind::NoneKw => Ok(ConditionKind::IsNone {
                    name,
                    metric,
                    negated,
                }),
                TokenKind::Nan => Ok(ConditionKind::IsNan {
                    name,
                    metric,
                    negated,
                }),
                TokenKind::Inf => Ok(ConditionKind::IsInf {
                    name,
                    metric,
                    negated,
                }),
                _ => Err(ParseError::unexpected_token(
                    token.span,
                    "NONE, NAN, or INF",
                    token.kind.name(),
                )),
            };
        }

        // `name."metric" STARTS WITH "..."` and friends
        if self.eat(&TokenKind::Starts) {
            self.expect(&TokenKind::With)?;
            let value = self.expect_string()?;
            return Ok(ConditionKind::StringCmp {
                name,
                metric,
                op: StringOpKind::StartsWith,
                value,
            });
        }
        if self.eat(&TokenKind::Ends) {
            self.expect(&TokenKind::With)?;
            let value = self.expect_string()?;
            return Ok(ConditionKind::StringCmp {
                name,
                metric,
                op: StringOpKind::EndsWith,
                value,
            });
        }
        if self.eat(&TokenKind::Contains) {
            let value = self.expect_string()?;
            return Ok(ConditionKind::StringCmp {
                name,
                metric,
                op: StringOpKind::Contains,
                value,
            });
        }
        if self.eat(&TokenKind::MatchRegex) {
            let value = self.expect_string()?;
            return Ok(ConditionKind::StringCmp {
                name,
                metric,
                op: StringOpKind::Matches,
                value,
            });
        }

        // Comparison operators. `=` dispatches on the value's token type.
        let op_token = self.advance();
        let num_op = match op_token.kind {
            TokenKind::Eq => None,
            TokenKind::Lt => Some(NumOpKind::Lt),
            TokenKind::Gt => Some(NumOpKind::Gt),
            TokenKind::LtEq => Some(NumOpKind::Le),
            TokenKind::GtEq => Some(NumOpKind::Ge),
            _ => {
                return Err(ParseError::unexpected_token(
                    op_token.span,
                    "comparison operator",
                    op_token.kind.name(),
                ));
            }
        };

        let value_token = self.advance();
        match (num_op, value_token.kind) {
            (None, TokenKind::Str(value)) => Ok(ConditionKind::StringCmp {
                name,
                metric,
                op: StringOpKind::Eq,
                value,
            }),
            (None, TokenKind::Int(n)) => Ok(ConditionKind::NumberCmp {
                name,
                metric,
                op: NumOpKind::Eq,
                value: n as f64,
            }),
            (None, TokenKind::Float(f)) => Ok(ConditionKind::NumberCmp {
                name,
                metric,
                op: NumOpKind::Eq,
                value: f,
            }),
            (Some(op), TokenKind::Int(n)) => Ok(ConditionKind::NumberCmp {
                name,
                metric,
                op,
                value: n as f64,
            }),
            (Some(op), TokenKind::Float(f)) => Ok(ConditionKind::NumberCmp {
                name,
                metric,
                op,
                value: f,
            }),
            (_, kind) => Err(ParseError::unexpected_token(
                value_token.span,
                "string or number literal",
                kind.name(),
            )),
        }
    }
}

/// Parse a full `MATCH ... WHERE ...` query from source text.
pub fn parse_query(input: &str) -> ParseResult<QueryAst> {
    Parser::new(input)?.parse_query()
}
