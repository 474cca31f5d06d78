//! Parser for the generated source dialect.
//!
//! The grammar is the subset of module syntax that snapshot and fixture files
//! use:
//!
//! ```text
//! program   := statement* EOF
//! statement := import | const | export
//! import    := "import" "type"? "{" (name ("as" name)?),* "}" "from" string ";"?
//! const     := "const" name "=" expr ";"?
//! export    := "export" "default" ( "function" name "(" ")" "{" "return" expr ";"? "}"
//!                                 | expr ";"? )
//! expr      := "-" expr | "new" postfix | postfix
//! postfix   := primary ( "." name | "(" expr,* ")" )*
//! primary   := literal | name | array | object | arrow | "(" expr ")"
//! ```

use super::lexer::{tokenize, Token, TokenKind};
use crate::errors::{ProxyError, ProxyResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(PropKey, Expr)>),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>),
    Neg(Box<Expr>),
    /// An arrow function, kept as its source text.
    Arrow(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PropKey {
    Ident(String),
    Str(String),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Import {
    /// `(exported, local)` pairs.
    pub names: Vec<(String, String)>,
    pub from: String,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Import(Import),
    Const(String, Expr),
    /// `export default <expr>` or `export default function f() { return <expr>; }`
    ExportDefault { expr: Expr, function: bool },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Import(import) => Some(import),
            _ => None,
        })
    }

    pub fn binding(&self, name: &str) -> Option<&Expr> {
        self.statements.iter().find_map(|s| match s {
            Statement::Const(n, expr) if n == name => Some(expr),
            _ => None,
        })
    }

    /// The default-exported expression, following a bare binding reference.
    pub fn default_export(&self) -> ProxyResult<&Expr> {
        let expr = self
            .statements
            .iter()
            .find_map(|s| match s {
                Statement::ExportDefault { expr, .. } => Some(expr),
                _ => None,
            })
            .ok_or_else(|| ProxyError::eval("module has no default export"))?;
        match expr {
            Expr::Ident(name) => self
                .binding(name)
                .ok_or_else(|| ProxyError::eval(format!("'{}' is not defined", name))),
            other => Ok(other),
        }
    }
}

pub(crate) fn parse(text: &str) -> ProxyResult<Program> {
    let tokens = tokenize(text)?;
    Parser {
        text,
        tokens,
        pos: 0,
    }
    .program()
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ProxyError {
        ProxyError::Parse {
            line: self.peek().line,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> ProxyError {
        let found = match &self.peek().kind {
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::Str(s) => format!("string {:?}", s),
            TokenKind::Num(n) => format!("number {}", n),
            TokenKind::Punct(c) => format!("'{}'", c),
            TokenKind::Arrow => "'=>'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        };
        self.error(format!("expected {}, found {}", expected, found))
    }

    fn expect_punct(&mut self, c: char) -> ProxyResult<()> {
        if self.peek().is_punct(c) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ProxyResult<()> {
        if self.peek().is_ident(keyword) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword)))
        }
    }

    fn name(&mut self) -> ProxyResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().is_punct(c) {
            self.next();
            true
        } else {
            false
        }
    }

    fn program(mut self) -> ProxyResult<Program> {
        let mut program = Program::default();
        while self.peek().kind != TokenKind::Eof {
            if self.eat_punct(';') {
                continue;
            }
            let statement = self.statement()?;
            program.statements.push(statement);
        }
        Ok(program)
    }

    fn statement(&mut self) -> ProxyResult<Statement> {
        if self.peek().is_ident("import") {
            self.next();
            return self.import();
        }
        if self.peek().is_ident("const") {
            self.next();
            let name = self.name()?;
            self.expect_punct('=')?;
            let expr = self.expr()?;
            self.eat_punct(';');
            return Ok(Statement::Const(name, expr));
        }
        if self.peek().is_ident("export") {
            self.next();
            self.expect_keyword("default")?;
            if self.peek().is_ident("function") {
                self.next();
                if !self.peek().is_punct('(') {
                    self.name()?;
                }
                self.expect_punct('(')?;
                self.expect_punct(')')?;
                self.expect_punct('{')?;
                self.expect_keyword("return")?;
                let expr = self.expr()?;
                self.eat_punct(';');
                self.expect_punct('}')?;
                return Ok(Statement::ExportDefault {
                    expr,
                    function: true,
                });
            }
            let expr = self.expr()?;
            self.eat_punct(';');
            return Ok(Statement::ExportDefault {
                expr,
                function: false,
            });
        }
        Err(self.unexpected("'import', 'const' or 'export'"))
    }

    fn import(&mut self) -> ProxyResult<Statement> {
        let type_only = self.peek().is_ident("type") && self.peek_at(1).is_punct('{');
        if type_only {
            self.next();
        }
        self.expect_punct('{')?;
        let mut names = Vec::new();
        while !self.peek().is_punct('}') {
            let exported = self.name()?;
            let local = if self.peek().is_ident("as") {
                self.next();
                self.name()?
            } else {
                exported.clone()
            };
            names.push((exported, local));
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}')?;
        self.expect_keyword("from")?;
        let from = match &self.peek().kind {
            TokenKind::Str(s) => s.clone(),
            _ => return Err(self.unexpected("a module path")),
        };
        self.next();
        self.eat_punct(';');
        Ok(Statement::Import(Import {
            names,
            from,
            type_only,
        }))
    }

    fn expr(&mut self) -> ProxyResult<Expr> {
        if self.eat_punct('-') {
            return Ok(Expr::Neg(Box::new(self.expr()?)));
        }
        if self.peek().is_ident("new") {
            self.next();
            let mut callee = self.primary()?;
            while self.eat_punct('.') {
                callee = Expr::Member(Box::new(callee), self.name()?);
            }
            let args = if self.peek().is_punct('(') {
                self.next();
                self.list(')')?
            } else {
                Vec::new()
            };
            return self.postfix(Expr::New(Box::new(callee), args));
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    fn postfix(&mut self, mut expr: Expr) -> ProxyResult<Expr> {
        loop {
            if self.eat_punct('.') {
                expr = Expr::Member(Box::new(expr), self.name()?);
            } else if self.eat_punct('(') {
                expr = Expr::Call(Box::new(expr), self.list(')')?);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn list(&mut self, close: char) -> ProxyResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.peek().is_punct(close) {
            items.push(self.expr()?);
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct(close)?;
        Ok(items)
    }

    fn primary(&mut self) -> ProxyResult<Expr> {
        if self.is_arrow_start() {
            return self.arrow();
        }
        let token = self.next();
        match token.kind {
            TokenKind::Num(n) => Ok(Expr::Num(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "null" => Expr::Null,
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                _ => Expr::Ident(name),
            }),
            TokenKind::Punct('[') => Ok(Expr::Array(self.list(']')?)),
            TokenKind::Punct('{') => self.object(),
            TokenKind::Punct('(') => {
                let expr = self.expr()?;
                self.expect_punct(')')?;
                Ok(expr)
            }
            other => {
                if other != TokenKind::Eof {
                    self.pos -= 1;
                }
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn object(&mut self) -> ProxyResult<Expr> {
        let mut fields = Vec::new();
        while !self.peek().is_punct('}') {
            let token = self.next();
            let key = match token.kind {
                TokenKind::Ident(name) => PropKey::Ident(name),
                TokenKind::Str(s) => PropKey::Str(s),
                TokenKind::Num(n) => PropKey::Str(crate::value::format_number(n)),
                TokenKind::Punct('[') => {
                    let expr = self.expr()?;
                    self.expect_punct(']')?;
                    PropKey::Computed(expr)
                }
                other => {
                    if other != TokenKind::Eof {
                        self.pos -= 1;
                    }
                    return Err(self.unexpected("a property key"));
                }
            };
            self.expect_punct(':')?;
            fields.push((key, self.expr()?));
            if !self.eat_punct(',') {
                break;
            }
        }
        self.expect_punct('}')?;
        Ok(Expr::Object(fields))
    }

    /// `name =>` or a parenthesized parameter list followed by `=>`.
    fn is_arrow_start(&self) -> bool {
        let token = self.peek();
        if matches!(token.kind, TokenKind::Ident(_)) {
            return self.peek_at(1).kind == TokenKind::Arrow;
        }
        if !token.is_punct('(') {
            return false;
        }
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            let t = self.peek_at(offset);
            match t.kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(offset + 1).kind == TokenKind::Arrow;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn arrow(&mut self) -> ProxyResult<Expr> {
        let start = self.peek().start;
        while self.peek().kind != TokenKind::Arrow {
            self.next();
        }
        self.next();
        let mut end = self.peek().end;
        self.name()?;
        while self.peek().is_punct('.') {
            self.next();
            end = self.peek().end;
            self.name()?;
        }
        Ok(Expr::Arrow(self.text[start..end].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_module() {
        let program = parse(
            r#"
            import { Services } from "../composition_root";
            import { modules as _modules } from "../testing";

            export default function get() {
                return [
                    { type: "call", fn: (obj: Services) => obj.storage.get, args: ["counter-1"], returns: undefined },
                ];
            }
            "#,
        )
        .unwrap();

        let imports: Vec<_> = program.imports().collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(
            imports[1].names,
            vec![("modules".to_string(), "_modules".to_string())]
        );
        assert_eq!(imports[1].from, "../testing");

        let entries = match program.default_export().unwrap() {
            Expr::Array(entries) => entries.clone(),
            other => panic!("unexpected export: {:?}", other),
        };
        assert_eq!(entries.len(), 1);
        let fields = match &entries[0] {
            Expr::Object(fields) => fields,
            other => panic!("unexpected entry: {:?}", other),
        };
        assert_eq!(
            fields[1],
            (
                PropKey::Ident("fn".to_string()),
                Expr::Arrow("(obj: Services) => obj.storage.get".to_string())
            )
        );
    }

    #[test]
    fn test_parse_fixtures_module() {
        let program = parse(
            "import { modules as _modules } from \"./testing\";\n\n\
             const fixtures = { counter: _modules.Counter.create({ id: \"1\", value: 0 }) };\n\n\
             export default fixtures;\n",
        )
        .unwrap();
        match program.default_export().unwrap() {
            Expr::Object(fields) => assert_eq!(fields[0].0, PropKey::Ident("counter".into())),
            other => panic!("unexpected export: {:?}", other),
        }
    }

    #[test]
    fn test_parse_new_and_negation() {
        let program = parse("export default [new Map([[1, -2]]), new Set(), -Infinity];").unwrap();
        let expected = Expr::Array(vec![
            Expr::New(
                Box::new(Expr::Ident("Map".into())),
                vec![Expr::Array(vec![Expr::Array(vec![
                    Expr::Num(1.0),
                    Expr::Neg(Box::new(Expr::Num(2.0))),
                ])])],
            ),
            Expr::New(Box::new(Expr::Ident("Set".into())), vec![]),
            Expr::Neg(Box::new(Expr::Ident("Infinity".into()))),
        ]);
        assert_eq!(program.default_export().unwrap(), &expected);
    }

    #[test]
    fn test_unexpected_token_reports_line() {
        let err = parse("const a = 1;\nconst b = ;").unwrap_err();
        match err {
            ProxyError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("expected an expression"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_default_export() {
        let program = parse("const a = 1;").unwrap();
        assert!(program.default_export().is_err());
    }
}
