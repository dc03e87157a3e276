//! `$filter` grammar and evaluator (C6 parsing, C7 evaluation pass).
//!
//! The original source's `query_param.hpp` left `$filter` largely
//! unimplemented (a TODO-shaped stub); the concrete BNF here comes from
//! `SPEC_FULL.md` §4.4, modeled on the OData filter grammar Redfish
//! inherits:
//!
//! ```text
//! or_expr    := and_expr ('or' and_expr)*
//! and_expr   := not_expr ('and' not_expr)*
//! not_expr   := ['not'] comparison
//! comparison := property op literal | '(' or_expr ')'
//! op         := 'eq' | 'ne' | 'gt' | 'ge' | 'lt' | 'le'
//! property   := identifier ('/' identifier)*
//! literal    := string | number | 'true' | 'false' | 'null'
//! ```

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    Or(Vec<FilterExpr>),
    And(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare {
        property: Vec<String>,
        op: CompareOp,
        literal: Literal,
    },
}

impl FilterExpr {
    /// Evaluate against one collection member's JSON body.
    pub fn eval(&self, member: &Value) -> bool {
        match self {
            FilterExpr::Or(parts) => parts.iter().any(|p| p.eval(member)),
            FilterExpr::And(parts) => parts.iter().all(|p| p.eval(member)),
            FilterExpr::Not(inner) => !inner.eval(member),
            FilterExpr::Compare { property, op, literal } => {
                let Some(actual) = resolve_property(member, property) else {
                    return false;
                };
                compare(&actual, *op, literal)
            }
        }
    }
}

fn resolve_property<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn compare(actual: &Value, op: CompareOp, literal: &Literal) -> bool {
    use std::cmp::Ordering;
    let ordering = match (actual, literal) {
        (Value::String(a), Literal::Str(b)) => a.as_str().partial_cmp(b.as_str()),
        (Value::Number(a), Literal::Number(b)) => a.as_f64().and_then(|a| a.partial_cmp(b)),
        (Value::Bool(a), Literal::Bool(b)) => a.partial_cmp(b),
        (Value::Null, Literal::Null) => Some(Ordering::Equal),
        _ => None,
    };
    match (op, ordering) {
        (CompareOp::Eq, Some(Ordering::Equal)) => true,
        (CompareOp::Ne, other) => other != Some(Ordering::Equal),
        (CompareOp::Gt, Some(Ordering::Greater)) => true,
        (CompareOp::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
        (CompareOp::Lt, Some(Ordering::Less)) => true,
        (CompareOp::Le, Some(Ordering::Less | Ordering::Equal)) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError(pub String);

struct Tokenizer<'a> {
    rest: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    LParen,
    RParen,
    Slash,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer { rest: input }
    }

    fn next(&mut self) -> Result<Option<Token>, FilterParseError> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return Ok(None);
        }
        let mut chars = self.rest.char_indices();
        let (_, first) = chars.next().unwrap();
        match first {
            '(' => {
                self.rest = &self.rest[1..];
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.rest = &self.rest[1..];
                Ok(Some(Token::RParen))
            }
            '/' => {
                self.rest = &self.rest[1..];
                Ok(Some(Token::Slash))
            }
            '\'' => {
                let end = self.rest[1..]
                    .find('\'')
                    .ok_or_else(|| FilterParseError("unterminated string literal".to_string()))?;
                let value = self.rest[1..1 + end].to_string();
                self.rest = &self.rest[2 + end..];
                Ok(Some(Token::Str(value)))
            }
            c if c.is_ascii_digit() || c == '-' => {
                let end = self
                    .rest
                    .find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-'))
                    .unwrap_or(self.rest.len());
                let text = &self.rest[..end];
                let value: f64 = text
                    .parse()
                    .map_err(|_| FilterParseError(format!("invalid number literal {text:?}")))?;
                self.rest = &self.rest[end..];
                Ok(Some(Token::Number(value)))
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = self
                    .rest
                    .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                    .unwrap_or(self.rest.len());
                let text = self.rest[..end].to_string();
                self.rest = &self.rest[end..];
                Ok(Some(Token::Ident(text)))
            }
            other => Err(FilterParseError(format!("unexpected character {other:?}"))),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<FilterExpr, FilterParseError> {
        let mut parts = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Ident(ident)) if ident == "or") {
            self.bump();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<FilterExpr, FilterParseError> {
        let mut parts = vec![self.parse_not()?];
        while matches!(self.peek(), Some(Token::Ident(ident)) if ident == "and") {
            self.bump();
            parts.push(self.parse_not()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            FilterExpr::And(parts)
        })
    }

    fn parse_not(&mut self) -> Result<FilterExpr, FilterParseError> {
        if matches!(self.peek(), Some(Token::Ident(ident)) if ident == "not") {
            self.bump();
            return Ok(FilterExpr::Not(Box::new(self.parse_comparison()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<FilterExpr, FilterParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.bump();
            let inner = self.parse_or()?;
            match self.bump() {
                Some(Token::RParen) => return Ok(inner),
                _ => return Err(FilterParseError("expected closing ')'".to_string())),
            }
        }

        let property = self.parse_property()?;
        let op = match self.bump() {
            Some(Token::Ident(ident)) => match ident.as_str() {
                "eq" => CompareOp::Eq,
                "ne" => CompareOp::Ne,
                "gt" => CompareOp::Gt,
                "ge" => CompareOp::Ge,
                "lt" => CompareOp::Lt,
                "le" => CompareOp::Le,
                other => return Err(FilterParseError(format!("unknown operator {other:?}"))),
            },
            other => return Err(FilterParseError(format!("expected comparison operator, got {other:?}"))),
        };
        let literal = match self.bump() {
            Some(Token::Str(s)) => Literal::Str(s),
            Some(Token::Number(n)) => Literal::Number(n),
            Some(Token::Ident(ident)) if ident == "true" => Literal::Bool(true),
            Some(Token::Ident(ident)) if ident == "false" => Literal::Bool(false),
            Some(Token::Ident(ident)) if ident == "null" => Literal::Null,
            other => return Err(FilterParseError(format!("expected literal, got {other:?}"))),
        };
        Ok(FilterExpr::Compare {
            property,
            op,
            literal,
        })
    }

    fn parse_property(&mut self) -> Result<Vec<String>, FilterParseError> {
        let mut segments = Vec::new();
        match self.bump() {
            Some(Token::Ident(ident)) => segments.push(ident),
            other => return Err(FilterParseError(format!("expected property name, got {other:?}"))),
        }
        while matches!(self.peek(), Some(Token::Slash)) {
            self.bump();
            match self.bump() {
                Some(Token::Ident(ident)) => segments.push(ident),
                other => return Err(FilterParseError(format!("expected property name after '/', got {other:?}"))),
            }
        }
        Ok(segments)
    }
}

pub fn parse(input: &str) -> Result<FilterExpr, FilterParseError> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next()? {
        tokens.push(token);
    }
    if tokens.is_empty() {
        return Err(FilterParseError("empty filter expression".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(FilterParseError("trailing tokens after filter expression".to_string()));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_evaluates_simple_comparison() {
        let expr = parse("Status/Health eq 'OK'").unwrap();
        let healthy = json!({"Status": {"Health": "OK"}});
        let degraded = json!({"Status": {"Health": "Warning"}});
        assert!(expr.eval(&healthy));
        assert!(!expr.eval(&degraded));
    }

    #[test]
    fn parses_and_or_not_with_precedence() {
        let expr = parse("ReadingVolts gt 10 and not (State eq 'Absent')").unwrap();
        let present_high = json!({"ReadingVolts": 12, "State": "Enabled"});
        let absent_high = json!({"ReadingVolts": 12, "State": "Absent"});
        let present_low = json!({"ReadingVolts": 5, "State": "Enabled"});
        assert!(expr.eval(&present_high));
        assert!(!expr.eval(&absent_high));
        assert!(!expr.eval(&present_low));
    }

    #[test]
    fn numeric_comparisons_use_numeric_ordering() {
        let expr = parse("ReadingVolts ge 100").unwrap();
        assert!(expr.eval(&json!({"ReadingVolts": 100})));
        assert!(expr.eval(&json!({"ReadingVolts": 150})));
        assert!(!expr.eval(&json!({"ReadingVolts": 99})));
    }

    #[test]
    fn missing_property_never_matches() {
        let expr = parse("Nonexistent eq 'x'").unwrap();
        assert!(!expr.eval(&json!({"Other": "y"})));
    }

    #[test]
    fn rejects_malformed_expression() {
        assert!(parse("Status/Health eq").is_err());
        assert!(parse("Status/Health bogus 'OK'").is_err());
    }
}
