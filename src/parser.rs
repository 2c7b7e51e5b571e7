//! Recursive-descent, Pratt-style parser producing a spanned [`Program`].

use crate::ast::*;
use crate::error::{self, LapisError, LapisResult};
use crate::source_map::Span;
use crate::token::{Literal, Token, TokenKind, TemplatePart as LexTemplatePart};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<LapisError>,
    max_errors: usize,
}

/// How many parse errors to accumulate before giving up on the file.
pub const DEFAULT_MAX_ERRORS: usize = 20;

const SYNC_STARTERS: &[TokenKind] = &[
    TokenKind::Class,
    TokenKind::Func,
    TokenKind::Var,
    TokenKind::For,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Return,
];

impl Parser {
    pub fn new(tokens: Vec<Token>, max_errors: usize) -> Self {
        Self { tokens, current: 0, errors: Vec::new(), max_errors }
    }

    /// Construct a parser with the default error cap.
    pub fn new_default(tokens: Vec<Token>) -> Self {
        Self::new(tokens, DEFAULT_MAX_ERRORS)
    }

    /// Parse the whole token stream. Errors are accumulated (up to
    /// `max_errors`) and synchronized past; a non-empty error vector means
    /// the parse as a whole failed even though partial recovery occurred.
    pub fn parse(mut self) -> Result<Program, Vec<LapisError>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            self.skip_ws();
            if self.is_at_end() {
                break;
            }
            if self.errors.len() >= self.max_errors {
                break;
            }
            match self.declaration() {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => {}
                Err(_) => unreachable!("declaration() reports into self.errors, never propagates"),
            }
        }
        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(self.errors)
        }
    }

    // --- declarations -----------------------------------------------------

    fn declaration(&mut self) -> LapisResult<Option<Stmt>> {
        match self.declaration_inner() {
            Ok(stmt) => Ok(Some(stmt)),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                Ok(None)
            }
        }
    }

    fn declaration_inner(&mut self) -> LapisResult<Stmt> {
        if self.matches(TokenKind::Package) {
            return self.package_statement();
        }
        if self.matches(TokenKind::Var) {
            return self.var_declaration(Access::Private);
        }
        if self.matches(TokenKind::Func) {
            return self.function_declaration(Access::Private);
        }
        if self.matches(TokenKind::Class) {
            return self.class_declaration(Access::Private);
        }
        if self.matches(TokenKind::Public) {
            return self.access_modified_declaration(Access::Public);
        }
        if self.matches(TokenKind::Private) {
            return self.access_modified_declaration(Access::Private);
        }
        self.statement()
    }

    fn access_modified_declaration(&mut self, access: Access) -> LapisResult<Stmt> {
        if self.matches(TokenKind::Var) {
            self.var_declaration(access)
        } else if self.matches(TokenKind::Func) {
            self.function_declaration(access)
        } else if self.matches(TokenKind::Class) {
            self.class_declaration(access)
        } else {
            let tok = self.peek();
            Err(error::expected_token(tok.span, "var, func, or class", tok.kind.as_str()))
        }
    }

    fn package_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let path_tok = self.consume(TokenKind::String, "string path")?;
        let path = match &path_tok.literal {
            Some(Literal::Str(s)) => s.clone(),
            _ => unreachable!("string token always carries a Str literal"),
        };

        let mut use_names = None;
        if self.matches(TokenKind::Use) {
            let mut names = vec![self.consume_identifier_name()?];
            while self.matches(TokenKind::Comma) {
                names.push(self.consume_identifier_name()?);
            }
            use_names = Some(names);
        }

        let end = self.consume(TokenKind::Semicolon, ";")?.span;
        Ok(Stmt::Package { path, use_names, span: start.to(end) })
    }

    fn var_declaration(&mut self, access: Access) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let name = self.consume_identifier_name()?;
        let init = if self.matches(TokenKind::Assign) { Some(self.expression()?) } else { None };
        let end = self.consume(TokenKind::Semicolon, ";")?.span;
        Ok(Stmt::VarDecl { access, name, init, span: start.to(end) })
    }

    fn parse_params(&mut self) -> LapisResult<Vec<Param>> {
        self.consume(TokenKind::LeftParen, "(")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            params.push(self.parse_param()?);
            while self.matches(TokenKind::Comma) {
                if params.last().map(|p: &Param| p.variadic).unwrap_or(false) {
                    return Err(error::variadic_not_last(self.previous().span));
                }
                params.push(self.parse_param()?);
            }
        }
        self.consume(TokenKind::RightParen, ")")?;
        Ok(params)
    }

    fn parse_param(&mut self) -> LapisResult<Param> {
        let tok = self.consume(TokenKind::Identifier, "parameter name")?;
        let name = identifier_name(&tok);
        let mut span = tok.span;
        let variadic = if self.matches(TokenKind::Power) {
            span = span.to(self.previous().span);
            true
        } else {
            false
        };
        Ok(Param { name, variadic, span })
    }

    fn function_declaration(&mut self, access: Access) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let name = self.consume_identifier_name()?;
        let params = self.parse_params()?;
        self.skip_ws();
        let body = self.block_until(&[TokenKind::End]);
        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::FuncDecl { access, decl: FuncDecl { name, params, body, span: start.to(end) } })
    }

    fn class_declaration(&mut self, access: Access) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let name = self.consume_identifier_name()?;
        if self.matches(TokenKind::LeftParen) {
            self.consume(TokenKind::RightParen, ")")?;
        }
        self.skip_ws();

        let mut methods = Vec::new();
        while !self.check(TokenKind::End) && !self.is_at_end() {
            if self.skip_one_ws() {
                continue;
            }
            if !self.matches(TokenKind::Func) {
                let tok = self.peek();
                self.errors.push(error::unexpected_token(tok.span, tok.kind.as_str()));
                self.synchronize();
                continue;
            }
            let method_start = self.previous().span;
            let method_name = if self.matches(TokenKind::Init) { "init".to_string() } else { self.consume_identifier_name()? };
            let params = self.parse_params()?;
            self.skip_ws();
            let body = self.block_until(&[TokenKind::End]);
            let method_end = self.consume(TokenKind::End, "end")?.span;
            methods.push(FuncDecl { name: method_name, params, body, span: method_start.to(method_end) });
        }
        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::ClassDecl { access, name, methods, span: start.to(end) })
    }

    // --- statements ---------------------------------------------------------

    fn statement(&mut self) -> LapisResult<Stmt> {
        if self.matches(TokenKind::If) {
            return self.if_statement();
        }
        if self.matches(TokenKind::While) {
            return self.while_statement();
        }
        if self.matches(TokenKind::For) {
            return self.for_statement();
        }
        if self.matches(TokenKind::Return) {
            return self.return_statement();
        }
        if self.matches(TokenKind::Break) {
            let span = self.previous().span;
            let end = self.consume(TokenKind::Semicolon, ";")?.span;
            return Ok(Stmt::Break(span.to(end)));
        }
        if self.matches(TokenKind::Continue) {
            let span = self.previous().span;
            let end = self.consume(TokenKind::Semicolon, ";")?.span;
            return Ok(Stmt::Continue(span.to(end)));
        }
        if self.matches(TokenKind::Try) {
            return self.try_statement();
        }
        if self.matches(TokenKind::Switch) {
            return self.switch_statement();
        }
        self.expression_statement()
    }

    /// Parse statements until one of `stops` is seen, skipping newlines/tabs.
    fn block_until(&mut self, stops: &[TokenKind]) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.check_any(stops) && !self.is_at_end() {
            if self.skip_one_ws() {
                continue;
            }
            if self.errors.len() >= self.max_errors {
                break;
            }
            if let Ok(Some(stmt)) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    fn if_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        self.consume(TokenKind::LeftParen, "(")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, ")")?;
        self.skip_ws();
        let then_branch = self.block_until(&[TokenKind::Elif, TokenKind::Else, TokenKind::End]);

        let mut branches = vec![(condition, then_branch)];
        while self.matches(TokenKind::Elif) {
            self.consume(TokenKind::LeftParen, "(")?;
            let cond = self.expression()?;
            self.consume(TokenKind::RightParen, ")")?;
            self.skip_ws();
            let body = self.block_until(&[TokenKind::Elif, TokenKind::Else, TokenKind::End]);
            branches.push((cond, body));
        }

        let else_branch = if self.matches(TokenKind::Else) {
            self.skip_ws();
            Some(self.block_until(&[TokenKind::End]))
        } else {
            None
        };

        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::If { branches, else_branch, span: start.to(end) })
    }

    fn while_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        self.consume(TokenKind::LeftParen, "(")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, ")")?;
        self.skip_ws();
        let body = self.block_until(&[TokenKind::End]);
        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::While { condition, body, span: start.to(end) })
    }

    fn for_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let var = self.consume_identifier_name()?;
        self.consume(TokenKind::In, "in")?;
        let iterable = self.expression()?;
        self.skip_ws();
        let body = self.block_until(&[TokenKind::End]);
        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::For { var, iterable, body, span: start.to(end) })
    }

    fn return_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        let value = if !self.check(TokenKind::Semicolon) && !self.check(TokenKind::Newline) {
            Some(self.expression()?)
        } else {
            None
        };
        let end = self.consume(TokenKind::Semicolon, ";")?.span;
        Ok(Stmt::Return(value, start.to(end)))
    }

    fn try_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        self.skip_ws();
        let body = self.block_until(&[TokenKind::Catch, TokenKind::Finally, TokenKind::End]);

        let mut catches = Vec::new();
        while self.matches(TokenKind::Catch) {
            let binding = if self.matches(TokenKind::LeftParen) {
                let name = self.consume_identifier_name()?;
                self.consume(TokenKind::RightParen, ")")?;
                Some(name)
            } else {
                None
            };
            self.skip_ws();
            let catch_body = self.block_until(&[TokenKind::Catch, TokenKind::Finally, TokenKind::End]);
            catches.push(CatchClause { binding, body: catch_body });
        }

        let finally = if self.matches(TokenKind::Finally) {
            self.skip_ws();
            Some(self.block_until(&[TokenKind::End]))
        } else {
            None
        };

        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::Try { body, catches, finally, span: start.to(end) })
    }

    fn switch_statement(&mut self) -> LapisResult<Stmt> {
        let start = self.previous().span;
        self.consume(TokenKind::LeftParen, "(")?;
        let discriminant = self.expression()?;
        self.consume(TokenKind::RightParen, ")")?;
        self.skip_ws();

        let mut cases = Vec::new();
        let mut default = None;
        while (self.check(TokenKind::Case) || self.check(TokenKind::Default)) && !self.is_at_end() {
            if self.matches(TokenKind::Case) {
                let mut values = vec![self.expression()?];
                while self.matches(TokenKind::Comma) {
                    values.push(self.expression()?);
                }
                self.consume(TokenKind::Colon, ":")?;
                self.skip_ws();
                let body = self.block_until(&[TokenKind::Case, TokenKind::Default, TokenKind::End]);
                cases.push(CaseClause { values, body });
            } else {
                self.advance();
                self.consume(TokenKind::Colon, ":")?;
                self.skip_ws();
                let body = self.block_until(&[TokenKind::Case, TokenKind::Default, TokenKind::End]);
                default = Some(body);
            }
        }

        let end = self.consume(TokenKind::End, "end")?.span;
        Ok(Stmt::Switch { discriminant, cases, default, span: start.to(end) })
    }

    fn expression_statement(&mut self) -> LapisResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, ";")?;
        Ok(Stmt::ExprStmt(expr))
    }

    /// Parse a single standalone expression with no surrounding statement
    /// syntax (no trailing `;`), used to re-parse a template literal's
    /// captured `{...}` source at evaluation time.
    pub fn parse_standalone_expression(mut self) -> LapisResult<Expr> {
        self.skip_ws();
        let expr = self.expression()?;
        self.skip_ws();
        Ok(expr)
    }

    // --- expressions (precedence climbing) ----------------------------------

    fn expression(&mut self) -> LapisResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> LapisResult<Expr> {
        let expr = self.logical_or()?;

        if self.matches(TokenKind::Assign) {
            let value = self.assignment()?;
            let span = expr.span().to(value.span());
            return match expr {
                Expr::Identifier(..) | Expr::Member { .. } | Expr::Index { .. } => {
                    Ok(Expr::Assign { target: Box::new(expr), value: Box::new(value), span })
                }
                _ => Err(error::invalid_assignment_target(expr.span())),
            };
        }
        Ok(expr)
    }

    fn logical_or(&mut self) -> LapisResult<Expr> {
        let mut expr = self.logical_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.logical_and()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op: BinaryOp::Or, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> LapisResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(TokenKind::And) {
            let right = self.equality()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op: BinaryOp::And, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> LapisResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = if self.matches(TokenKind::Equal) {
                BinaryOp::Eq
            } else if self.matches(TokenKind::NotEqual) {
                BinaryOp::NotEq
            } else {
                break;
            };
            let right = self.comparison()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> LapisResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = if self.matches(TokenKind::Greater) {
                BinaryOp::Gt
            } else if self.matches(TokenKind::GreaterEqual) {
                BinaryOp::GtEq
            } else if self.matches(TokenKind::Less) {
                BinaryOp::Lt
            } else if self.matches(TokenKind::LessEqual) {
                BinaryOp::LtEq
            } else {
                break;
            };
            let right = self.term()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn term(&mut self) -> LapisResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = if self.matches(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.matches(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.factor()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> LapisResult<Expr> {
        let mut expr = self.power()?;
        loop {
            let op = if self.matches(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.matches(TokenKind::Slash) {
                BinaryOp::Div
            } else if self.matches(TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.power()?;
            let span = expr.span().to(right.span());
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right), span };
        }
        Ok(expr)
    }

    fn power(&mut self) -> LapisResult<Expr> {
        let expr = self.unary()?;
        if self.matches(TokenKind::Power) {
            let right = self.power()?; // right-associative
            let span = expr.span().to(right.span());
            return Ok(Expr::Binary { op: BinaryOp::Pow, left: Box::new(expr), right: Box::new(right), span });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> LapisResult<Expr> {
        if self.matches(TokenKind::Bang) {
            let start = self.previous().span;
            let operand = self.unary()?;
            let span = start.to(operand.span());
            return Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand), span });
        }
        if self.matches(TokenKind::Minus) {
            let start = self.previous().span;
            let operand = self.unary()?;
            let span = start.to(operand.span());
            return Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), span });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> LapisResult<Expr> {
        let expr = self.call()?;
        if self.matches(TokenKind::PlusPlus) {
            let span = expr.span().to(self.previous().span);
            return Ok(Expr::Postfix { op: PostfixOp::Inc, target: Box::new(expr), span });
        }
        if self.matches(TokenKind::MinusMinus) {
            let span = expr.span().to(self.previous().span);
            return Ok(Expr::Postfix { op: PostfixOp::Dec, target: Box::new(expr), span });
        }
        Ok(expr)
    }

    fn call(&mut self) -> LapisResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenKind::Dot) {
                let name = self.consume_identifier_name()?;
                let span = expr.span().to(self.previous().span);
                expr = Expr::Member { object: Box::new(expr), name, span };
            } else if self.matches(TokenKind::LeftBracket) {
                let index = self.expression()?;
                let end = self.consume(TokenKind::RightBracket, "]")?.span;
                let span = expr.span().to(end);
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index), span };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> LapisResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            args.push(self.expression()?);
            while self.matches(TokenKind::Comma) {
                args.push(self.expression()?);
            }
        }
        let end = self.consume(TokenKind::RightParen, ")")?.span;
        let span = callee.span().to(end);
        Ok(Expr::Call { callee: Box::new(callee), args, span })
    }

    fn primary(&mut self) -> LapisResult<Expr> {
        if self.matches(TokenKind::Boolean) {
            let tok = self.previous();
            let b = matches!(tok.literal, Some(Literal::Bool(true)));
            return Ok(Expr::Bool(b, tok.span));
        }
        if self.matches(TokenKind::Null) {
            return Ok(Expr::Null(self.previous().span));
        }
        if self.matches(TokenKind::Number) {
            let tok = self.previous();
            let n = match &tok.literal {
                Some(Literal::Number(n)) => *n,
                _ => unreachable!("number token always carries a Number literal"),
            };
            return Ok(Expr::Number(n, tok.span));
        }
        if self.matches(TokenKind::String) {
            let tok = self.previous();
            let s = match &tok.literal {
                Some(Literal::Str(s)) => s.clone(),
                _ => unreachable!("string token always carries a Str literal"),
            };
            return Ok(Expr::Str(s, tok.span));
        }
        if self.matches(TokenKind::TemplateLiteral) {
            let tok = self.previous();
            let span = tok.span;
            let parts = match &tok.literal {
                Some(Literal::Template(parts)) => parts
                    .iter()
                    .map(|p| match p {
                        LexTemplatePart::Text(s) => TemplatePartNode::Text(s.clone()),
                        LexTemplatePart::Expr(s) => TemplatePartNode::Expr(s.clone(), span),
                    })
                    .collect(),
                _ => unreachable!("template literal token always carries a Template literal"),
            };
            return Ok(Expr::Template(parts, span));
        }
        if self.matches(TokenKind::This) {
            return Ok(Expr::This(self.previous().span));
        }
        if self.matches(TokenKind::Identifier) {
            let tok = self.previous();
            return Ok(Expr::Identifier(identifier_name(tok), tok.span));
        }
        if self.matches(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, ")")?;
            return Ok(expr);
        }
        if self.matches(TokenKind::LeftBracket) {
            return self.array_literal();
        }
        if self.matches(TokenKind::LeftBrace) {
            return self.dictionary_literal();
        }

        let tok = self.peek();
        Err(error::expected_expression(tok.span))
    }

    fn array_literal(&mut self) -> LapisResult<Expr> {
        let start = self.previous().span;
        let mut elements = Vec::new();
        self.skip_ws();
        if !self.check(TokenKind::RightBracket) {
            elements.push(self.expression()?);
            self.skip_ws();
            while self.matches(TokenKind::Comma) {
                self.skip_ws();
                if self.check(TokenKind::RightBracket) {
                    break;
                }
                elements.push(self.expression()?);
                self.skip_ws();
            }
        }
        self.skip_ws();
        let end = self.consume(TokenKind::RightBracket, "]")?.span;
        Ok(Expr::Array(elements, start.to(end)))
    }

    fn dictionary_literal(&mut self) -> LapisResult<Expr> {
        let start = self.previous().span;
        let mut pairs = Vec::new();
        self.skip_ws();
        if !self.check(TokenKind::RightBrace) {
            let key = self.dictionary_key()?;
            self.consume(TokenKind::Colon, ":")?;
            let value = self.expression()?;
            pairs.push((key, value));
            self.skip_ws();

            while self.matches(TokenKind::Comma) {
                self.skip_ws();
                if self.check(TokenKind::RightBrace) {
                    break;
                }
                let key = self.dictionary_key()?;
                self.consume(TokenKind::Colon, ":")?;
                let value = self.expression()?;
                pairs.push((key, value));
                self.skip_ws();
            }
        }
        self.skip_ws();
        let end = self.consume(TokenKind::RightBrace, "}")?.span;
        Ok(Expr::Dict(pairs, start.to(end)))
    }

    /// Bare identifiers are treated as string literals (JS-object-literal
    /// style); anything else is parsed as a full expression.
    fn dictionary_key(&mut self) -> LapisResult<Expr> {
        if self.check(TokenKind::Identifier) {
            let tok = self.advance().clone();
            return Ok(Expr::Str(identifier_name(&tok), tok.span));
        }
        self.expression()
    }

    // --- token utilities ------------------------------------------------------

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|k| self.check(*k))
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> LapisResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let tok = self.peek();
        Err(error::expected_token(tok.span, expected, tok.kind.as_str()))
    }

    fn consume_identifier_name(&mut self) -> LapisResult<String> {
        let tok = self.consume(TokenKind::Identifier, "identifier")?;
        Ok(identifier_name(tok))
    }

    /// True and advances past exactly one newline/tab token; false otherwise.
    fn skip_one_ws(&mut self) -> bool {
        if self.check(TokenKind::Newline) || self.check(TokenKind::Tab) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.skip_one_ws() {}
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                log::debug!("parser resynchronized after ';'");
                return;
            }
            if self.check_any(SYNC_STARTERS) {
                log::debug!("parser resynchronized at '{}'", self.peek().kind.as_str());
                return;
            }
            self.advance();
        }
    }
}

fn identifier_name(token: &Token) -> String {
    match &token.literal {
        Some(Literal::Str(s)) => s.clone(),
        _ => token.lexeme.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::source_map::SourceMap;

    fn parse_ok(src: &str) -> Program {
        let mut map = SourceMap::new();
        let tokens = Lexer::new(&mut map, "<test>", src).tokenize().unwrap();
        Parser::new(tokens, 20).parse().expect("parse should succeed")
    }

    #[test]
    fn parses_var_declaration() {
        let program = parse_ok("var x = 1 + 2;");
        assert_eq!(program.len(), 1);
        match &program[0] {
            Stmt::VarDecl { name, init: Some(_), .. } => assert_eq!(name, "x"),
            other => panic!("expected var decl, got {other:?}"),
        }
    }

    #[test]
    fn exponent_is_right_associative() {
        let program = parse_ok("var x = 2 ** 3 ** 2;");
        match &program[0] {
            Stmt::VarDecl { init: Some(Expr::Binary { op: BinaryOp::Pow, right, .. }), .. } => {
                assert!(matches!(**right, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("expected right-associative power expr, got {other:?}"),
        }
    }

    #[test]
    fn if_elif_else_chain() {
        let program = parse_ok("if (1) x(); elif (2) y(); else z(); end");
        match &program[0] {
            Stmt::If { branches, else_branch, .. } => {
                assert_eq!(branches.len(), 2);
                assert!(else_branch.is_some());
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn variadic_param_must_be_last() {
        let mut map = SourceMap::new();
        let tokens = Lexer::new(&mut map, "<test>", "func f(a**, b) end").tokenize().unwrap();
        let err = Parser::new(tokens, 20).parse().unwrap_err();
        assert!(err.iter().any(|e| e.diagnostic.code == "LAP2001"));
    }

    #[test]
    fn trailing_comma_in_array_and_dict() {
        let program = parse_ok("var a = [1, 2,]; var b = {x: 1,};");
        assert!(matches!(&program[0], Stmt::VarDecl { init: Some(Expr::Array(elements, _)), .. } if elements.len() == 2));
        assert!(matches!(&program[1], Stmt::VarDecl { init: Some(Expr::Dict(pairs, _)), .. } if pairs.len() == 1));
    }

    #[test]
    fn error_recovery_continues_past_bad_statement() {
        let mut map = SourceMap::new();
        let tokens = Lexer::new(&mut map, "<test>", "var = ; var y = 1;").tokenize().unwrap();
        let result = Parser::new(tokens, 20).parse();
        assert!(result.is_err());
    }
}
