//! Recursive-descent parser for map functions
//!
//! Accepted forms:
//! - `function (doc, meta) { ... }` (a name after `function` is allowed)
//! - `(doc, meta) => { ... }` and `doc => { ... }`
//!
//! An optional trailing `;` is accepted. Nothing else may follow.

use crate::ast::{BinaryOp, Expr, ForKind, Function, Literal, LogicalOp, Stmt, UnaryOp};
use crate::error::{ScriptError, ScriptResult};
use crate::lexer::{tokenize, Punct, Spanned, Token};

/// Parse map function source into a [`Function`]
pub fn parse_function(source: &str, max_depth: usize) -> ScriptResult<Function> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let function = parser.function()?;
    parser.eat(Punct::Semi);
    if !matches!(parser.peek(), Token::Eof) {
        return Err(parser.error("unexpected input after function body"));
    }
    Ok(function)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(self.tokens[self.pos].pos, message)
    }

    fn is_punct(&self, punct: Punct) -> bool {
        matches!(self.peek(), Token::Punct(p) if *p == punct)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == word)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct, what: &str) -> ScriptResult<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn ident(&mut self, what: &str) -> ScriptResult<String> {
        match self.peek() {
            Token::Ident(name) if !is_reserved(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn enter(&mut self) -> ScriptResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ScriptError::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ========================================================================
    // Function header
    // ========================================================================

    fn function(&mut self) -> ScriptResult<Function> {
        if self.is_keyword("function") {
            self.advance();
            if matches!(self.peek(), Token::Ident(_)) {
                self.ident("function name")?;
            }
            self.expect(Punct::LParen, "'(' after function")?;
            let params = self.params()?;
            let body = self.block_body()?;
            return Ok(Function { params, body });
        }

        // Arrow forms
        let params = if self.eat(Punct::LParen) {
            self.params()?
        } else {
            vec![self.ident("'function' or arrow parameters")?]
        };
        self.expect(Punct::Arrow, "'=>'")?;
        let body = if self.is_punct(Punct::LBrace) {
            self.block_body()?
        } else {
            vec![Stmt::Expr(self.expression()?)]
        };
        Ok(Function { params, body })
    }

    /// Parameter names up to and including the closing `)`
    fn params(&mut self) -> ScriptResult<Vec<String>> {
        let mut params = Vec::new();
        if self.eat(Punct::RParen) {
            return Ok(params);
        }
        loop {
            params.push(self.ident("parameter name")?);
            if self.eat(Punct::RParen) {
                return Ok(params);
            }
            self.expect(Punct::Comma, "',' or ')' in parameter list")?;
        }
    }

    fn block_body(&mut self) -> ScriptResult<Vec<Stmt>> {
        self.expect(Punct::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.eat(Punct::RBrace) {
            if matches!(self.peek(), Token::Eof) {
                return Err(self.error("expected '}'"));
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> ScriptResult<Stmt> {
        self.enter()?;
        let stmt = self.statement_inner();
        self.leave();
        stmt
    }

    fn statement_inner(&mut self) -> ScriptResult<Stmt> {
        if self.is_punct(Punct::LBrace) {
            return Ok(Stmt::Block(self.block_body()?));
        }
        if self.eat(Punct::Semi) {
            return Ok(Stmt::Empty);
        }
        if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            self.advance();
            let mut decls = Vec::new();
            loop {
                let name = self.ident("variable name")?;
                let init = if self.eat(Punct::Assign) {
                    Some(self.assignment()?)
                } else {
                    None
                };
                decls.push(Stmt::Declare(name, init));
                if !self.eat(Punct::Comma) {
                    break;
                }
            }
            self.eat(Punct::Semi);
            return Ok(if decls.len() == 1 {
                decls.remove(0)
            } else {
                Stmt::Block(decls)
            });
        }
        if self.is_keyword("if") {
            self.advance();
            self.expect(Punct::LParen, "'(' after if")?;
            let cond = self.expression()?;
            self.expect(Punct::RParen, "')' after condition")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.is_keyword("else") {
                self.advance();
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If(cond, then, otherwise));
        }
        if self.is_keyword("for") {
            return self.for_statement();
        }
        if self.is_keyword("return") {
            self.advance();
            let value = if self.is_punct(Punct::Semi)
                || self.is_punct(Punct::RBrace)
                || matches!(self.peek(), Token::Eof)
            {
                None
            } else {
                Some(self.expression()?)
            };
            self.eat(Punct::Semi);
            return Ok(Stmt::Return(value));
        }
        if let Token::Ident(word) = self.peek() {
            if matches!(word.as_str(), "while" | "do" | "function" | "throw" | "try") {
                return Err(self.error(format!("'{}' is not supported in map functions", word)));
            }
        }

        let expr = self.expression()?;
        self.eat(Punct::Semi);
        Ok(Stmt::Expr(expr))
    }

    fn for_statement(&mut self) -> ScriptResult<Stmt> {
        self.advance();
        self.expect(Punct::LParen, "'(' after for")?;
        if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            self.advance();
        }
        let binding = self.ident("loop variable")?;
        let kind = if self.is_keyword("of") {
            ForKind::Of
        } else if self.is_keyword("in") {
            ForKind::In
        } else {
            return Err(
                self.error("only 'for (x of ...)' and 'for (x in ...)' loops are supported")
            );
        };
        self.advance();
        let iterable = self.expression()?;
        self.expect(Punct::RParen, "')' after loop header")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            kind,
            binding,
            iterable,
            body,
        })
    }

    // ========================================================================
    // Expressions (lowest to highest precedence)
    // ========================================================================

    fn expression(&mut self) -> ScriptResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ScriptResult<Expr> {
        let target = self.conditional()?;
        if self.is_punct(Punct::Assign) {
            let Expr::Ident(name) = target else {
                return Err(self.error("invalid assignment target"));
            };
            self.advance();
            self.enter()?;
            let value = self.assignment();
            self.leave();
            return Ok(Expr::Assign(name, Box::new(value?)));
        }
        Ok(target)
    }

    fn conditional(&mut self) -> ScriptResult<Expr> {
        let cond = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(cond);
        }
        self.enter()?;
        let then = self.assignment()?;
        self.expect(Punct::Colon, "':' in conditional expression")?;
        let otherwise = self.assignment()?;
        self.leave();
        Ok(Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    // Left-folded chains such as `a + b + c` or `f()()` nest one level per
    // link, so each link enters once and the whole chain leaves at the end.
    // A failed parse is abandoned, so error paths skip the bookkeeping.

    fn logical_or(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.logical_and()?;
        let mut links = 0;
        while self.eat(Punct::OrOr) {
            self.enter()?;
            links += 1;
            let rhs = self.logical_and()?;
            lhs = Expr::Logical(LogicalOp::Or, Box::new(lhs), Box::new(rhs));
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn logical_and(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.equality()?;
        let mut links = 0;
        while self.eat(Punct::AndAnd) {
            self.enter()?;
            links += 1;
            let rhs = self.equality()?;
            lhs = Expr::Logical(LogicalOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        ops: &[(Punct, BinaryOp)],
        next: fn(&mut Self) -> ScriptResult<Expr>,
    ) -> ScriptResult<Expr> {
        let mut lhs = next(self)?;
        let mut links = 0;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(*punct) {
                    self.enter()?;
                    links += 1;
                    let rhs = next(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            self.depth -= links;
            return Ok(lhs);
        }
    }

    fn equality(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNe),
                (Punct::EqEq, BinaryOp::LooseEq),
                (Punct::NotEq, BinaryOp::LooseNe),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (Punct::Le, BinaryOp::Le),
                (Punct::Ge, BinaryOp::Ge),
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Gt, BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ScriptResult<Expr> {
        self.binary_level(
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> ScriptResult<Expr> {
        let op = if self.is_punct(Punct::Not) {
            Some(UnaryOp::Not)
        } else if self.is_punct(Punct::Minus) {
            Some(UnaryOp::Neg)
        } else if self.is_punct(Punct::Plus) {
            Some(UnaryOp::Plus)
        } else if self.is_keyword("typeof") {
            Some(UnaryOp::TypeOf)
        } else {
            None
        };

        match op {
            Some(op) => {
                self.advance();
                self.enter()?;
                let operand = self.unary();
                self.leave();
                Ok(Expr::Unary(op, Box::new(operand?)))
            }
            None => self.postfix(),
        }
    }

    fn postfix(&mut self) -> ScriptResult<Expr> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            let punct = [Punct::Dot, Punct::LBracket, Punct::LParen]
                .into_iter()
                .find(|p| self.is_punct(*p));
            let Some(punct) = punct else {
                self.depth -= links;
                return Ok(expr);
            };
            self.advance();
            self.enter()?;
            links += 1;
            expr = match punct {
                Punct::Dot => {
                    // Keywords are valid property names
                    let name = match self.advance() {
                        Token::Ident(name) => name,
                        _ => return Err(self.error("expected property name after '.'")),
                    };
                    Expr::Member(Box::new(expr), name)
                }
                Punct::LBracket => {
                    let index = self.expression()?;
                    self.expect(Punct::RBracket, "']'")?;
                    Expr::Index(Box::new(expr), Box::new(index))
                }
                _ => Expr::Call(Box::new(expr), self.list(Punct::RParen)?),
            };
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed
    fn list(&mut self, close: Punct) -> ScriptResult<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.assignment()?);
            if !self.eat(Punct::Comma) {
                self.expect(close, "',' or closing delimiter")?;
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> ScriptResult<Expr> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Token::Ident(word) => {
                let literal = match word.as_str() {
                    "true" => Some(Literal::Bool(true)),
                    "false" => Some(Literal::Bool(false)),
                    "null" => Some(Literal::Null),
                    "undefined" => Some(Literal::Undefined),
                    _ => None,
                };
                if let Some(literal) = literal {
                    self.advance();
                    return Ok(Expr::Literal(literal));
                }
                if is_reserved(&word) {
                    return Err(self.error(format!("unexpected keyword '{}'", word)));
                }
                self.advance();
                Ok(Expr::Ident(word))
            }
            Token::Punct(Punct::LParen) => {
                self.advance();
                self.enter()?;
                let inner = self.expression();
                self.leave();
                let inner = inner?;
                self.expect(Punct::RParen, "')'")?;
                Ok(inner)
            }
            Token::Punct(Punct::LBracket) => {
                self.advance();
                self.enter()?;
                let items = self.list(Punct::RBracket);
                self.leave();
                Ok(Expr::Array(items?))
            }
            Token::Punct(Punct::LBrace) => {
                self.advance();
                self.enter()?;
                let props = self.object_props();
                self.leave();
                Ok(Expr::Object(props?))
            }
            Token::Eof => Err(self.error("unexpected end of input")),
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    fn object_props(&mut self) -> ScriptResult<Vec<(String, Expr)>> {
        let mut props = Vec::new();
        loop {
            if self.eat(Punct::RBrace) {
                return Ok(props);
            }
            let name = match self.advance() {
                Token::Ident(name) | Token::Str(name) => name,
                Token::Number(n) => format_number(n),
                _ => return Err(self.error("expected property name")),
            };
            self.expect(Punct::Colon, "':' after property name")?;
            let value = self.assignment()?;
            props.push((name, value));
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RBrace, "',' or '}' in object literal")?;
                return Ok(props);
            }
        }
    }
}

fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "var"
            | "let"
            | "const"
            | "if"
            | "else"
            | "for"
            | "return"
            | "function"
            | "typeof"
            | "true"
            | "false"
            | "null"
            | "while"
            | "do"
            | "new"
            | "throw"
            | "try"
    )
}

/// JavaScript-style number formatting (`1` rather than `1.0`)
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}
