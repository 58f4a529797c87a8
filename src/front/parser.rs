/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Recursive-descent parser building directly into an `ir::graph::Procedure`
//! arena — no separate parser AST, matching how `parser.py`'s statement
//! classes fold into a flat, doubly linked body once a procedure is done.
//! `switch`/`case`/`default` are recognized but go unimplemented, the same
//! as `parser.py`'s own `parse_switch`/`parse_case`/`parse_default` stubs.
//! `for`'s three clauses are single expressions rather than `parser.py`'s
//! general comma lists, since this language has no comma operator to parse
//! one into.

use std::collections::HashMap;

use tracing::trace;

use crate::errors::{CodegenError, Result};
use crate::front::kw::{Keyword, Word};
use crate::front::lexer::{Token, TokenKind};
use crate::ir::expr::{BinOp, Constant, Expr, UnOp};
use crate::ir::graph::{NodeId, Procedure};
use crate::ir::node::NodeKind;
use crate::ir::types::Type;
use crate::ir::var::{StorageClass, VarId, Variable};

/// A statement produced before label targets are known. Jump targets are
/// symbolic names, resolved once the whole procedure body has been walked —
/// the same two-pass shape as `parser.py`'s `block.flatten0()`, adapted to
/// name-based resolution since our arena indexes by position rather than by
/// live Python object identity.
enum PreStmt {
    Assign { lhs: VarId, rhs: Expr },
    Jump { target: String, cond: Option<Expr> },
    Label { name: String },
}

struct Scope {
    vars: HashMap<String, VarId>,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    proc: Procedure,
    scopes: Vec<Scope>,
    body: Vec<PreStmt>,
    return_var: Option<VarId>,
    break_label: Option<String>,
    continue_label: Option<String>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> CodegenError {
        let t = self.peek();
        CodegenError::Parse { line: t.line, col: t.col, message: message.into() }
    }

    fn find_var(&self, name: &str) -> Option<VarId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.vars.get(name) {
                return Some(id);
            }
        }
        None
    }

    fn declare_var(&mut self, name: &str, id: VarId) {
        self.scopes.last_mut().unwrap().vars.insert(name.to_string(), id);
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope { vars: HashMap::new() });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn basic_kind_type(&self, t: &Token) -> Option<Type> {
        match t.kind {
            TokenKind::TypeName(b) => Some(Type::scalar(b)),
            _ => None,
        }
    }

    // ---- expressions, by descending precedence level (parser.py naming) ----

    fn parse_expr_1(&mut self) -> Result<Expr> {
        let t = self.advance();
        match t.kind {
            TokenKind::Ident(name) => {
                let id = self.find_var(&name).ok_or_else(|| {
                    CodegenError::Parse { line: t.line, col: t.col, message: format!("symbol '{}' not declared", name) }
                })?;
                Ok(Expr::Var(id, self.proc.var(id).ty))
            }
            TokenKind::IntConst(v) => Ok(Expr::Const(Constant::int(v, Type::S32))),
            TokenKind::FloatConst(v) => Ok(Expr::Const(Constant::float(v, Type::scalar(crate::ir::types::BasicKind::F64)))),
            TokenKind::LParen => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::Paren(Box::new(e)))
            }
            TokenKind::Intrinsic(i) => {
                self.expect(TokenKind::LParen, "'(' after intrinsic name")?;
                let mut args = vec![self.parse_expr()?];
                while self.accept(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
                self.expect(TokenKind::RParen, "')' after intrinsic arguments")?;
                let ty = args[0].ty();
                Ok(Expr::intrinsic(i.name(), args, ty))
            }
            other => Err(CodegenError::Parse { line: t.line, col: t.col, message: format!("syntax error in expression, found {:?}", other) }),
        }
    }

    fn parse_expr_2(&mut self) -> Result<Expr> {
        let line = self.peek().line;
        let col = self.peek().col;
        let op = match self.peek().kind {
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Star => Some(UnOp::Load),
            TokenKind::Not => Some(UnOp::Not),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_expr_2()?;
                Expr::unary(op, operand, line, col)
            }
            None => self.parse_expr_1(),
        }
    }

    fn parse_expr_3(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_2()?;
        loop {
            let (line, col) = (self.peek().line, self.peek().col);
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            a = Expr::binary(op, a, self.parse_expr_2()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_4(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_3()?;
        loop {
            let (line, col) = (self.peek().line, self.peek().col);
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            a = Expr::binary(op, a, self.parse_expr_3()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_5(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_4()?;
        loop {
            let (line, col) = (self.peek().line, self.peek().col);
            let op = match self.peek().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            a = Expr::binary(op, a, self.parse_expr_4()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_6(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_5()?;
        loop {
            let (line, col) = (self.peek().line, self.peek().col);
            let op = match self.peek().kind {
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                _ => break,
            };
            self.advance();
            a = Expr::binary(op, a, self.parse_expr_5()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_7(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_6()?;
        loop {
            let (line, col) = (self.peek().line, self.peek().col);
            let op = match self.peek().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            a = Expr::binary(op, a, self.parse_expr_6()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_8(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_7()?;
        while self.check(&TokenKind::Amp) {
            let (line, col) = (self.peek().line, self.peek().col);
            self.advance();
            a = Expr::binary(BinOp::BitAnd, a, self.parse_expr_7()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_9(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_8()?;
        while self.check(&TokenKind::Caret) {
            let (line, col) = (self.peek().line, self.peek().col);
            self.advance();
            a = Expr::binary(BinOp::BitXor, a, self.parse_expr_8()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_10(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_9()?;
        while self.check(&TokenKind::Pipe) {
            let (line, col) = (self.peek().line, self.peek().col);
            self.advance();
            a = Expr::binary(BinOp::BitOr, a, self.parse_expr_9()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_11(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_10()?;
        while self.check(&TokenKind::AndAnd) {
            let (line, col) = (self.peek().line, self.peek().col);
            self.advance();
            a = Expr::binary(BinOp::LogAnd, a, self.parse_expr_10()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_12(&mut self) -> Result<Expr> {
        let mut a = self.parse_expr_11()?;
        while self.check(&TokenKind::OrOr) {
            let (line, col) = (self.peek().line, self.peek().col);
            self.advance();
            a = Expr::binary(BinOp::LogOr, a, self.parse_expr_11()?, line, col)?;
        }
        Ok(a)
    }

    fn parse_expr_13(&mut self) -> Result<Expr> {
        let e = self.parse_expr_12()?;
        if !self.accept(&TokenKind::Question) {
            return Ok(e);
        }
        let a = self.parse_expr_13()?;
        self.expect(TokenKind::Colon, "':' after '?' branch")?;
        let b = self.parse_expr_13()?;
        Ok(Expr::ternary(e, a, b))
    }

    /// Top-level expression entry (`parser.py`'s `parse_expr`, which sits
    /// above assignment at level 14 — assignment is not an expression here,
    /// it is the only shape a statement-level `lvalue '=' rhs` takes).
    fn parse_expr(&mut self) -> Result<Expr> {
        Ok(self.parse_expr_13()?.simplify())
    }

    fn parse_expr_list_until(&mut self, terminator: &TokenKind) -> Result<Vec<Expr>> {
        let mut result = Vec::new();
        if self.check(terminator) {
            return Ok(result);
        }
        loop {
            result.push(self.parse_expr()?);
            if self.check(terminator) {
                break;
            }
            self.expect(TokenKind::Comma, "',' in expression list")?;
        }
        Ok(result)
    }

    // ---- statements ----

    fn invert(&self, cond: Expr) -> Expr {
        // UnOp::Not never fails to type-check (it accepts any operand type),
        // so the line/col passed here are never surfaced in an error.
        Expr::unary(UnOp::Not, cond, 0, 0).expect("UnOp::Not always type-checks").simplify()
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        let t = self.advance();
        match t.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(CodegenError::Parse { line: t.line, col: t.col, message: format!("expected {}", what) }),
        }
    }

    fn parse_var_decl(&mut self, ty: Type, is_static: bool) -> Result<()> {
        loop {
            let name = self.expect_ident("a variable name")?;
            let mut var = Variable::new(name.clone(), ty);
            var.storage = StorageClass { is_static, is_extern: false };
            let id = self.proc.alloc_var(var);
            self.declare_var(&name, id);

            if self.accept(&TokenKind::Assign) {
                let init = self.parse_expr()?;
                self.body.push(PreStmt::Assign { lhs: id, rhs: init });
            }

            if self.accept(&TokenKind::Semi) {
                break;
            }
            self.expect(TokenKind::Comma, "',' or ';' in variable declaration")?;
        }
        Ok(())
    }

    fn parse_if(&mut self) -> Result<()> {
        self.expect(TokenKind::LParen, "'(' after if")?;
        let cond = self.invert(self.parse_expr()?);
        self.expect(TokenKind::RParen, "')' after if condition")?;

        // `skip_label` marks where the then-clause ends, whether or not an
        // `else` follows — deciding that requires parsing the then-clause
        // first, the same order `parser.py`'s `parse_if` uses.
        let skip_label = self.proc.fresh_label_name();
        self.body.push(PreStmt::Jump { target: skip_label.clone(), cond: Some(cond) });
        self.parse_stmt_or_block()?;

        if self.accept(&TokenKind::Keyword(Keyword::Else)) {
            let end_label = self.proc.fresh_label_name();
            self.body.push(PreStmt::Jump { target: end_label.clone(), cond: None });
            self.body.push(PreStmt::Label { name: skip_label });
            self.parse_stmt_or_block()?;
            self.body.push(PreStmt::Label { name: end_label });
        } else {
            self.body.push(PreStmt::Label { name: skip_label });
        }
        Ok(())
    }

    fn parse_while(&mut self) -> Result<()> {
        let break_save = self.break_label.take();
        let continue_save = self.continue_label.take();
        let break_label = self.proc.fresh_label_name();
        let continue_label = self.proc.fresh_label_name();
        self.break_label = Some(break_label.clone());
        self.continue_label = Some(continue_label.clone());

        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.invert(self.parse_expr()?);
        self.expect(TokenKind::RParen, "')' after while condition")?;

        self.body.push(PreStmt::Label { name: continue_label.clone() });
        self.body.push(PreStmt::Jump { target: break_label.clone(), cond: Some(cond) });
        self.parse_stmt_or_block()?;
        self.body.push(PreStmt::Jump { target: continue_label, cond: None });
        self.body.push(PreStmt::Label { name: break_label });

        self.break_label = break_save;
        self.continue_label = continue_save;
        Ok(())
    }

    fn parse_do(&mut self) -> Result<()> {
        let break_save = self.break_label.take();
        let continue_save = self.continue_label.take();
        let break_label = self.proc.fresh_label_name();
        let continue_label = self.proc.fresh_label_name();
        self.break_label = Some(break_label.clone());
        self.continue_label = Some(continue_label.clone());

        self.body.push(PreStmt::Label { name: continue_label.clone() });
        self.parse_stmt_or_block()?;

        self.expect(TokenKind::Keyword(Keyword::While), "'while' after do-block")?;
        self.expect(TokenKind::LParen, "'(' after while")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')' after while condition")?;
        self.expect(TokenKind::Semi, "';' after do-while")?;

        self.body.push(PreStmt::Jump { target: continue_label, cond: Some(cond) });
        self.body.push(PreStmt::Label { name: break_label });

        self.break_label = break_save;
        self.continue_label = continue_save;
        Ok(())
    }

    fn parse_for(&mut self) -> Result<()> {
        self.expect(TokenKind::LParen, "'(' after for")?;

        let init = if self.check(&TokenKind::Semi) { None } else { Some(self.parse_expr_assign_like()?) };
        self.expect(TokenKind::Semi, "';' after for-initializer")?;
        let cond = if self.check(&TokenKind::Semi) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semi, "';' after for-condition")?;
        let step = if self.check(&TokenKind::RParen) { None } else { Some(self.parse_expr_assign_like()?) };
        self.expect(TokenKind::RParen, "')' after for-clauses")?;

        if let Some((lhs, rhs)) = init {
            self.body.push(PreStmt::Assign { lhs, rhs });
        }

        let break_save = self.break_label.take();
        let continue_save = self.continue_label.take();
        let break_label = self.proc.fresh_label_name();
        let continue_label = self.proc.fresh_label_name();
        self.break_label = Some(break_label.clone());
        self.continue_label = Some(continue_label.clone());
        let top_label = self.proc.fresh_label_name();

        self.body.push(PreStmt::Label { name: top_label.clone() });
        if let Some(cond) = cond {
            self.body.push(PreStmt::Jump { target: break_label.clone(), cond: Some(self.invert(cond)) });
        }
        self.parse_stmt_or_block()?;
        self.body.push(PreStmt::Label { name: continue_label });
        if let Some((lhs, rhs)) = step {
            self.body.push(PreStmt::Assign { lhs, rhs });
        }
        self.body.push(PreStmt::Jump { target: top_label, cond: None });
        self.body.push(PreStmt::Label { name: break_label });

        self.break_label = break_save;
        self.continue_label = continue_save;
        Ok(())
    }

    /// A bare `lvalue '=' expr` with no trailing semicolon, for `for`'s
    /// non-final clauses.
    fn parse_expr_assign_like(&mut self) -> Result<(VarId, Expr)> {
        let t = self.advance();
        let name = match t.kind {
            TokenKind::Ident(n) => n,
            _ => return Err(CodegenError::Parse { line: t.line, col: t.col, message: "expected an lvalue in for-clause".to_string() }),
        };
        let id = self
            .find_var(&name)
            .ok_or_else(|| CodegenError::Parse { line: t.line, col: t.col, message: format!("symbol '{}' not declared", name) })?;
        self.expect(TokenKind::Assign, "'=' in for-clause")?;
        let rhs = self.parse_expr()?;
        Ok((id, rhs))
    }

    fn parse_goto(&mut self) -> Result<()> {
        let t = self.advance();
        let name = match t.kind {
            TokenKind::Ident(n) => n,
            _ => return Err(CodegenError::Parse { line: t.line, col: t.col, message: "expected a label after goto".to_string() }),
        };
        self.expect(TokenKind::Semi, "';' after goto target")?;
        self.body.push(PreStmt::Jump { target: name, cond: None });
        Ok(())
    }

    fn parse_return(&mut self) -> Result<()> {
        if self.accept(&TokenKind::Semi) {
            if self.return_var.is_some() {
                return Err(self.error("missing return value"));
            }
        } else {
            let rv = self.return_var.ok_or_else(|| self.error("return has a value in a void function"))?;
            let value = self.parse_expr()?;
            self.expect(TokenKind::Semi, "';' after return value")?;
            self.body.push(PreStmt::Assign { lhs: rv, rhs: value });
        }
        self.body.push(PreStmt::Jump { target: DONE_LABEL.to_string(), cond: None });
        Ok(())
    }

    fn parse_break(&mut self) -> Result<()> {
        self.expect(TokenKind::Semi, "';' after break")?;
        let target = self.break_label.clone().ok_or_else(|| self.error("break outside of a loop"))?;
        self.body.push(PreStmt::Jump { target, cond: None });
        Ok(())
    }

    fn parse_continue(&mut self) -> Result<()> {
        self.expect(TokenKind::Semi, "';' after continue")?;
        let target = self.continue_label.clone().ok_or_else(|| self.error("continue outside of a loop"))?;
        self.body.push(PreStmt::Jump { target, cond: None });
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<()> {
        match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Static) => {
                self.advance();
                let t = self.advance();
                let ty = self.basic_kind_type(&t).ok_or_else(|| self.error("expected a type name after static"))?;
                self.parse_var_decl(ty, true)
            }
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                self.parse_if()
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                self.parse_while()
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                self.parse_do()
            }
            TokenKind::Keyword(Keyword::For) => {
                self.advance();
                self.parse_for()
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.advance();
                self.parse_goto()
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                self.parse_return()
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.parse_break()
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.parse_continue()
            }
            TokenKind::Keyword(Keyword::Switch | Keyword::Case | Keyword::Default) => {
                Err(self.error("switch/case/default are recognized but not implemented"))
            }
            TokenKind::TypeName(b) => {
                self.advance();
                self.parse_var_decl(Type::scalar(b), false)
            }
            TokenKind::LBrace => {
                self.advance();
                self.push_scope();
                while !self.check(&TokenKind::RBrace) {
                    self.parse_statement()?;
                }
                self.advance();
                self.pop_scope();
                Ok(())
            }
            TokenKind::Ident(name) if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon)) => {
                self.advance();
                self.advance();
                self.body.push(PreStmt::Label { name });
                Ok(())
            }
            _ => {
                let (lhs, rhs) = self.parse_expr_assign_like()?;
                self.expect(TokenKind::Semi, "';' after assignment")?;
                self.body.push(PreStmt::Assign { lhs, rhs });
                Ok(())
            }
        }
    }

    fn parse_stmt_or_block(&mut self) -> Result<()> {
        if self.check(&TokenKind::LBrace) {
            self.advance();
            self.push_scope();
            while !self.check(&TokenKind::RBrace) {
                self.parse_statement()?;
            }
            self.advance();
            self.pop_scope();
            Ok(())
        } else {
            self.parse_statement()
        }
    }

    fn parse_arglist(&mut self) -> Result<Vec<VarId>> {
        let mut args = Vec::new();
        if self.accept(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            let t = self.advance();
            let ty = self.basic_kind_type(&t).ok_or_else(|| self.error("expected a type name in the argument list"))?;
            let name_tok = self.advance();
            let name = match name_tok.kind {
                TokenKind::Ident(n) => n,
                _ => return Err(self.error("expected a parameter name")),
            };
            let id = self.proc.alloc_var(Variable::new(name.clone(), ty));
            self.declare_var(&name, id);
            args.push(id);

            if self.accept(&TokenKind::RParen) {
                break;
            }
            self.expect(TokenKind::Comma, "',' in argument list")?;
        }
        Ok(args)
    }

    /// Resolves every `PreStmt` into real IR nodes: one pass to place
    /// labels and note their arena position, a second to patch jump targets
    /// now that every label name is known. Mirrors `parser.py`'s
    /// `block.flatten0()`, minus the identity-based label linking Python
    /// gets for free.
    fn finish(mut self) -> Result<Procedure> {
        let mut labels: HashMap<String, NodeId> = HashMap::new();
        let mut jumps: Vec<(NodeId, String)> = Vec::new();

        for stmt in self.body {
            match stmt {
                PreStmt::Assign { lhs, rhs } => {
                    self.proc.push_back(NodeKind::Assign { lhs, rhs });
                }
                PreStmt::Label { name } => {
                    let id = self.proc.push_back(NodeKind::Label { name: name.clone(), defined: true, jumps: Vec::new(), phis: Vec::new() });
                    labels.insert(name, id);
                }
                PreStmt::Jump { target, cond } => {
                    let id = self.proc.push_back(NodeKind::Jump { target: self.proc.done_label, cond });
                    jumps.push((id, target));
                }
            }
        }

        let done_label = self.proc.append_done_label();
        labels.insert(DONE_LABEL.to_string(), done_label);

        for (jump_id, target_name) in jumps {
            let target = *labels
                .get(&target_name)
                .ok_or_else(|| CodegenError::invariant("front::parser::finish", 0, format!("undefined label '{}'", target_name)))?;
            if let NodeKind::Jump { target: t, .. } = &mut self.proc.get_mut(jump_id).kind {
                *t = target;
            }
            if let NodeKind::Label { jumps, .. } = &mut self.proc.get_mut(target).kind {
                jumps.push(jump_id);
            }
        }

        Ok(self.proc)
    }
}

/// Sentinel key used in the label-resolution map for a procedure's implicit
/// trailing `return`-target label, which `ir::graph::Procedure` creates up
/// front rather than the parser discovering it as ordinary source text.
const DONE_LABEL: &str = "\0done";

/// Parses every procedure definition in a token stream.
pub fn parse(tokens: &[Token]) -> Result<Vec<Procedure>> {
    let mut pos = 0;
    let mut procs = Vec::new();

    while !matches!(tokens[pos].kind, TokenKind::Eof) {
        let mut q_static = false;
        let mut q_extern = false;
        loop {
            match tokens[pos].kind {
                TokenKind::Keyword(Keyword::Static) => {
                    q_static = true;
                    pos += 1;
                }
                TokenKind::Keyword(Keyword::Extern) => {
                    q_extern = true;
                    pos += 1;
                }
                _ => break,
            }
        }

        let ty_tok = &tokens[pos];
        let basic = match ty_tok.kind {
            TokenKind::TypeName(b) => b,
            _ => return Err(CodegenError::Parse { line: ty_tok.line, col: ty_tok.col, message: "missing type name".to_string() }),
        };
        pos += 1;

        let name_tok = &tokens[pos];
        let name = match &name_tok.kind {
            TokenKind::Ident(n) => n.clone(),
            _ => return Err(CodegenError::Parse { line: name_tok.line, col: name_tok.col, message: "missing name".to_string() }),
        };
        pos += 1;

        if !matches!(tokens[pos].kind, TokenKind::LParen) {
            return Err(CodegenError::Parse {
                line: tokens[pos].line,
                col: tokens[pos].col,
                message: "global variable declarations are not supported; expected a procedure".to_string(),
            });
        }
        if q_static || q_extern {
            return Err(CodegenError::Parse { line: name_tok.line, col: name_tok.col, message: "static/extern qualifiers are not allowed on a procedure".to_string() });
        }
        pos += 1;

        let ty = Type::scalar(basic);
        let mut proc = Procedure::new(name);
        let return_var = if ty == Type::VOID { None } else { Some(proc.alloc_var(Variable::new(".retval", ty))) };

        let mut parser = Parser {
            tokens,
            pos,
            proc,
            scopes: vec![Scope { vars: HashMap::new() }],
            body: Vec::new(),
            return_var,
            break_label: None,
            continue_label: None,
        };
        let args = parser.parse_arglist()?;
        parser.expect(TokenKind::LBrace, "'{' to start the procedure body")?;
        parser.push_scope();
        while !parser.check(&TokenKind::RBrace) {
            parser.parse_statement()?;
        }
        parser.advance();
        parser.pop_scope();

        pos = parser.pos;
        let mut proc = parser.finish()?;
        proc.args = args;
        proc.return_var = return_var;
        procs.push(proc);
    }

    if procs.is_empty() {
        trace!("no procedures found in source");
    }
    Ok(procs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front::lexer::lex;

    fn parse_one(src: &str) -> Procedure {
        let tokens = lex(src).unwrap();
        parse(&tokens).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn parses_a_straight_line_function() {
        let proc = parse_one("int4 add_one(int4 x) { int4 y; y = x + 1; return y; }");
        assert_eq!(proc.name, "add_one");
        assert_eq!(proc.args.len(), 1);
        let labels = proc.iter_ids().filter(|&id| proc.get(id).kind.is_label()).count();
        assert!(labels >= 1);
    }

    #[test]
    fn parses_if_else_as_two_conditional_jumps() {
        let proc = parse_one("int4 pick(int4 a) { int4 r; if (a > 0) { r = 1; } else { r = -1; } return r; }");
        let jumps = proc.iter_ids().filter(|&id| matches!(proc.get(id).kind, NodeKind::Jump { .. })).count();
        assert!(jumps >= 3);
    }

    #[test]
    fn parses_a_while_loop() {
        let proc = parse_one("int4 count(int4 n) { int4 i; i = 0; while (i < n) { i = i + 1; } return i; }");
        assert!(proc.iter_ids().any(|id| proc.get(id).kind.is_label()));
    }

    #[test]
    fn goto_to_an_undeclared_label_is_an_error() {
        let tokens = lex("void f() { goto nope; }").unwrap();
        assert!(parse(&tokens).is_err());
    }

    #[test]
    fn void_procedure_has_no_return_variable() {
        let proc = parse_one("void f() { return; }");
        assert!(proc.return_var.is_none());
    }
}
