//! Recursive-descent parser with compile-time reference checks.
//!
//! The parser tracks the variables in scope while it reads a rule body, so
//! unknown variables, redeclarations, unknown builtins and arity mismatches
//! are all reported here, with the offending token's position.

use confgate_core::{CompileError, Value};

use crate::ast::{BinOp, Definition, Expr, Module, ParsedRule, RuleKind, Stmt, TemplatePart};
use crate::builtins;
use crate::lexer::{tokenize, tokenize_at, Token, TokenKind};

const KEYWORDS: &[&str] = &["package", "not", "some", "every", "in"];
const RESERVED: &[&str] = &["input", "data", "true", "false", "null"];

/// Parse one rule source into a module.
pub(crate) fn parse_module(source_name: &str, text: &str) -> Result<Module, CompileError> {
    let tokens = tokenize(source_name, text)?;
    Parser::new(source_name, tokens, Vec::new()).module()
}

struct Parser<'a> {
    source_name: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    scope: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(source_name: &'a str, tokens: Vec<Token>, scope: Vec<String>) -> Self {
        Self {
            source_name,
            tokens,
            pos: 0,
            scope,
        }
    }

    // -----------------------------------------------------------------------
    // Token cursor
    // -----------------------------------------------------------------------

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_is_ident(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(name) if name == word)
    }

    fn nth_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> CompileError {
        CompileError {
            source_name: self.source_name.to_string(),
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, CompileError> {
        if *self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            let found = self.peek().clone();
            Err(self.error(
                &found,
                format!("expected {} {context}, found {}", kind.describe(), found.kind.describe()),
            ))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<(String, Token), CompileError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                Ok((name.clone(), token.clone()))
            }
            other => Err(self.error(
                &token,
                format!("expected identifier {context}, found {}", other.describe()),
            )),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    // -----------------------------------------------------------------------
    // Module and rules
    // -----------------------------------------------------------------------

    fn module(mut self) -> Result<Module, CompileError> {
        self.skip_separators();
        if !self.peek_is_ident("package") {
            let token = self.peek().clone();
            return Err(self.error(&token, "rule source must start with a `package` declaration"));
        }
        self.advance();
        let package = self.dotted_name()?;
        self.end_of_declaration()?;

        let mut rules = Vec::new();
        loop {
            self.skip_separators();
            if *self.peek_kind() == TokenKind::Eof {
                break;
            }
            rules.push(self.rule()?);
            self.end_of_declaration()?;
        }
        Ok(Module { package, rules })
    }

    fn dotted_name(&mut self) -> Result<String, CompileError> {
        let (mut name, _) = self.expect_ident("in package name")?;
        while *self.peek_kind() == TokenKind::Dot {
            self.advance();
            let (segment, _) = self.expect_ident("after `.` in package name")?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok(name)
    }

    fn end_of_declaration(&mut self) -> Result<(), CompileError> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => Ok(()),
            other => {
                let message = format!("expected newline, found {}", other.describe());
                let token = self.peek().clone();
                Err(self.error(&token, message))
            }
        }
    }

    fn rule(&mut self) -> Result<ParsedRule, CompileError> {
        let token = self.advance();
        let name = match &token.kind {
            TokenKind::Ident(name) if name == "package" => {
                return Err(self.error(&token, "duplicate package declaration"));
            }
            TokenKind::Ident(name) => name.clone(),
            other => {
                return Err(self.error(
                    &token,
                    format!("expected rule name, found {}", other.describe()),
                ))
            }
        };
        let kind = RuleKind::from_name(&name).ok_or_else(|| {
            self.error(
                &token,
                format!(
                    "invalid rule name `{name}`: expected `deny`, `violation` or `warn`, \
                     optionally followed by `_suffix`"
                ),
            )
        })?;

        let template = match self.peek_kind() {
            TokenKind::Str(text) => {
                let text = text.clone();
                let at = self.advance();
                Some((text, at))
            }
            _ => None,
        };
        self.expect(TokenKind::LBrace, "to open the rule body")?;
        self.scope.clear();
        let body = self.body()?;
        let template = match template {
            Some((text, at)) => Some(self.template(&text, &at)?),
            None => None,
        };
        Ok(ParsedRule {
            name,
            kind,
            definition: Definition {
                source_name: self.source_name.to_string(),
                line: token.line,
                template,
                body,
            },
        })
    }

    /// Parse statements up to and including the closing `}`.
    fn body(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(stmts);
                }
                TokenKind::Eof => {
                    let token = self.peek().clone();
                    return Err(self.error(&token, "unclosed rule body: expected `}`"));
                }
                _ => {}
            }
            stmts.push(self.statement()?);
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace => {}
                other => {
                    let message = format!(
                        "expected newline or `}}` after statement, found {}",
                        other.describe()
                    );
                    let token = self.peek().clone();
                    return Err(self.error(&token, message));
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statements and scope
    // -----------------------------------------------------------------------

    fn declare(&mut self, name: &str, token: &Token) -> Result<(), CompileError> {
        if RESERVED.contains(&name) {
            return Err(self.error(token, format!("`{name}` is reserved and cannot be bound")));
        }
        if self.scope.iter().any(|bound| bound == name) {
            return Err(self.error(token, format!("variable `{name}` is already declared")));
        }
        self.scope.push(name.to_string());
        Ok(())
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        if self.peek_is_ident("not") {
            self.advance();
            return Ok(Stmt::Not(self.expr()?));
        }
        if self.peek_is_ident("some") {
            self.advance();
            let names = self.binding_names()?;
            let domain = self.expr()?;
            for (name, token) in &names {
                self.declare(name, token)?;
            }
            return Ok(Stmt::Some {
                with_key: names.len() == 2,
                domain,
            });
        }
        if self.peek_is_ident("every") {
            self.advance();
            let names = self.binding_names()?;
            let domain = self.expr()?;
            self.expect(TokenKind::LBrace, "to open the `every` body")?;
            let mark = self.scope.len();
            for (name, token) in &names {
                self.declare(name, token)?;
            }
            let body = self.body()?;
            self.scope.truncate(mark);
            return Ok(Stmt::Every {
                with_key: names.len() == 2,
                domain,
                body,
            });
        }
        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && self.nth_kind(1) == Some(&TokenKind::Assign)
        {
            let (name, token) = self.expect_ident("before `:=`")?;
            self.advance();
            let value = self.expr()?;
            self.declare(&name, &token)?;
            return Ok(Stmt::Assign(value));
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    /// `x in` or `k, x in`.
    fn binding_names(&mut self) -> Result<Vec<(String, Token)>, CompileError> {
        let mut names = vec![self.expect_ident("to bind")?];
        if *self.peek_kind() == TokenKind::Comma {
            self.advance();
            names.push(self.expect_ident("to bind")?);
        }
        if !self.peek_is_ident("in") {
            let token = self.peek().clone();
            return Err(self.error(
                &token,
                format!("expected `in`, found {}", token.kind.describe()),
            ));
        }
        self.advance();
        Ok(names)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let left = self.additive()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::Ident(word) if word == "in" => BinOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if *self.peek_kind() == TokenKind::Minus {
            self.advance();
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    let field = match &token.kind {
                        TokenKind::Ident(name) => name.clone(),
                        other => {
                            return Err(self.error(
                                &token,
                                format!("expected field name after `.`, found {}", other.describe()),
                            ))
                        }
                    };
                    expr = Expr::Field(Box::new(expr), field);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(TokenKind::RBracket, "to close the index")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Str(ref s) => Ok(Expr::Literal(Value::String(s.clone()))),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "to close the parenthesis")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.array(),
            TokenKind::Ident(ref name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "input" => Ok(Expr::Input),
                "data" => Ok(Expr::Data),
                word if KEYWORDS.contains(&word) => {
                    Err(self.error(&token, format!("unexpected keyword `{word}`")))
                }
                _ if *self.peek_kind() == TokenKind::LParen => self.call(&token, name),
                _ => match self.scope.iter().rposition(|bound| bound == name) {
                    Some(slot) => Ok(Expr::Local(slot)),
                    None => Err(self.error(&token, format!("unknown variable `{name}`"))),
                },
            },
            ref other => Err(self.error(
                &token,
                format!("expected expression, found {}", other.describe()),
            )),
        }
    }

    fn array(&mut self) -> Result<Expr, CompileError> {
        let mut items = Vec::new();
        loop {
            if *self.peek_kind() == TokenKind::RBracket {
                self.advance();
                return Ok(Expr::Array(items));
            }
            items.push(self.expr()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {}
                other => {
                    let message = format!("expected `,` or `]` in array, found {}", other.describe());
                    let token = self.peek().clone();
                    return Err(self.error(&token, message));
                }
            }
        }
    }

    fn call(&mut self, token: &Token, name: &str) -> Result<Expr, CompileError> {
        let (canonical, arity) = builtins::lookup(name)
            .ok_or_else(|| self.error(token, format!("unknown builtin `{name}`")))?;
        self.expect(TokenKind::LParen, "to open the argument list")?;
        let mut args = Vec::new();
        loop {
            if *self.peek_kind() == TokenKind::RParen {
                self.advance();
                break;
            }
            args.push(self.expr()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {}
                other => {
                    let message =
                        format!("expected `,` or `)` in argument list, found {}", other.describe());
                    let at = self.peek().clone();
                    return Err(self.error(&at, message));
                }
            }
        }
        if args.len() != arity {
            return Err(self.error(
                token,
                format!("`{name}` takes {arity} argument(s), got {}", args.len()),
            ));
        }
        Ok(Expr::Call(canonical, args))
    }

    // -----------------------------------------------------------------------
    // Message templates
    // -----------------------------------------------------------------------

    /// Split `"{expr} text"` into parts. `{{` and `}}` are literal braces.
    /// Placeholders see the variables bound by the rule body.
    fn template(&self, text: &str, at: &Token) -> Result<Vec<TemplatePart>, CompileError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(self.error(at, "unclosed `{` in message template"));
                    }
                    if inner.trim().is_empty() {
                        return Err(self.error(at, "empty placeholder in message template"));
                    }
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Expr(self.placeholder(&inner, at)?));
                }
                '}' => return Err(self.error(at, "unmatched `}` in message template")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Text(literal));
        }
        Ok(parts)
    }

    fn placeholder(&self, inner: &str, at: &Token) -> Result<Expr, CompileError> {
        let tokens = tokenize_at(self.source_name, inner, at.line, at.column)?;
        let mut sub = Parser::new(self.source_name, tokens, self.scope.clone());
        let expr = sub.expr()?;
        sub.skip_separators();
        if *sub.peek_kind() != TokenKind::Eof {
            let token = sub.peek().clone();
            return Err(sub.error(
                &token,
                format!("unexpected {} in message template placeholder", token.kind.describe()),
            ));
        }
        Ok(expr)
    }
}
