//! Deterministic pretty-printer for generated source.
//!
//! Every snapshot and fixtures file goes through [`format_source`] before it
//! is compared or written, so rendered text does not depend on how the
//! serializer happened to space things. The layout rules are a small subset
//! of what JS formatters do:
//!
//! - a bracketed group prints on one line when it fits within `print_width`,
//!   otherwise one item per line with a trailing comma;
//! - a call whose only argument is an object or array hugs it:
//!   `create({` ... `})`;
//! - a `{ ... }` following a parameter list is a block and always breaks;
//! - one blank line is kept wherever the input had at least one.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::errors::{ProxyError, ProxyResult};
use crate::source::{tokenize, Token, TokenKind};
use crate::value::format_number;

const KEYWORDS: &[&str] = &[
    "import", "export", "default", "const", "return", "from", "as", "function", "type", "new",
];

const STATEMENT_STARTS: &[&str] = &["import", "export", "const", "return"];

/// Layout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Preferred maximum line width.
    pub print_width: usize,
    /// Spaces per indentation level.
    pub indent_width: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            print_width: 100,
            indent_width: 4,
        }
    }
}

/// Reformat generated source text.
pub fn format_source(text: &str, options: &FormatOptions) -> ProxyResult<String> {
    let nodes = build_tree(tokenize(text)?)?;
    let mut printer = Printer {
        options,
        out: String::new(),
    };
    printer.statements(&nodes, 0);
    if !printer.out.is_empty() {
        printer.out.push('\n');
    }
    Ok(printer.out)
}

#[derive(Debug)]
enum Node {
    Token(Token),
    Group(Group),
}

#[derive(Debug)]
struct Group {
    open: char,
    close: char,
    children: Vec<Node>,
    /// Brace group directly after a parameter list.
    block: bool,
    blank_before: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edge {
    Word,
    Keyword,
    Punct(char),
    Arrow,
    Open(char),
    Close(char),
}

fn build_tree(tokens: Vec<Token>) -> ProxyResult<Vec<Node>> {
    let mut stack: Vec<(Group, usize)> = Vec::new();
    let mut root: Vec<Node> = Vec::new();

    for token in tokens {
        let close = match token.kind {
            TokenKind::Punct(c @ ('{' | '[' | '(')) => {
                let siblings = stack.last().map_or(&root, |(g, _)| &g.children);
                let block = c == '{'
                    && matches!(siblings.last(), Some(Node::Group(Group { open: '(', .. })));
                let group = Group {
                    open: c,
                    close: match c {
                        '{' => '}',
                        '[' => ']',
                        _ => ')',
                    },
                    children: Vec::new(),
                    block,
                    blank_before: token.blank_before,
                };
                stack.push((group, token.line));
                continue;
            }
            TokenKind::Punct(c @ ('}' | ']' | ')')) => c,
            TokenKind::Eof => break,
            _ => {
                match stack.last_mut() {
                    Some((group, _)) => group.children.push(Node::Token(token)),
                    None => root.push(Node::Token(token)),
                }
                continue;
            }
        };

        let (group, _) = stack.pop().ok_or_else(|| ProxyError::Parse {
            line: token.line,
            message: format!("unmatched '{}'", close),
        })?;
        if group.close != close {
            return Err(ProxyError::Parse {
                line: token.line,
                message: format!("expected '{}', found '{}'", group.close, close),
            });
        }
        match stack.last_mut() {
            Some((parent, _)) => parent.children.push(Node::Group(group)),
            None => root.push(Node::Group(group)),
        }
    }

    match stack.pop() {
        Some((group, line)) => Err(ProxyError::Parse {
            line,
            message: format!("unclosed '{}'", group.open),
        }),
        None => Ok(root),
    }
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(name) => name.clone(),
        TokenKind::Str(s) => serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s)),
        TokenKind::Num(n) => format_number(*n),
        TokenKind::Punct(c) => c.to_string(),
        TokenKind::Arrow => "=>".to_string(),
        TokenKind::Eof => String::new(),
    }
}

fn token_edge(token: &Token) -> Edge {
    match &token.kind {
        TokenKind::Ident(name) if KEYWORDS.contains(&name.as_str()) => Edge::Keyword,
        TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_) => Edge::Word,
        TokenKind::Punct(c) => Edge::Punct(*c),
        TokenKind::Arrow => Edge::Arrow,
        TokenKind::Eof => Edge::Punct(' '),
    }
}

fn first_edge(node: &Node) -> Edge {
    match node {
        Node::Token(token) => token_edge(token),
        Node::Group(group) => Edge::Open(group.open),
    }
}

fn last_edge(node: &Node) -> Edge {
    match node {
        Node::Token(token) => token_edge(token),
        Node::Group(group) => Edge::Close(group.close),
    }
}

fn space_between(prev: &Node, next: &Node) -> bool {
    match (last_edge(prev), first_edge(next)) {
        (_, Edge::Punct(',' | ';' | '.' | ':')) => false,
        (Edge::Punct('.'), _) => false,
        (Edge::Punct(',' | ':' | ';'), _) => true,
        (Edge::Arrow, _) | (_, Edge::Arrow) => true,
        (Edge::Punct('='), _) | (_, Edge::Punct('=')) => true,
        (Edge::Punct('-'), _) => false,
        (_, Edge::Open('{')) => true,
        (Edge::Keyword, _) => true,
        (_, Edge::Open(_)) => false,
        (Edge::Word | Edge::Close(_), Edge::Punct('-')) => true,
        (Edge::Word | Edge::Close(_), Edge::Word | Edge::Keyword) => true,
        _ => false,
    }
}

fn is_punct(node: &Node, c: char) -> bool {
    matches!(node, Node::Token(token) if token.is_punct(c))
}

fn starts_statement(node: &Node) -> bool {
    matches!(node, Node::Token(token) if STATEMENT_STARTS.iter().any(|k| token.is_ident(k)))
}

fn blank_before(node: &Node) -> bool {
    match node {
        Node::Token(token) => token.blank_before,
        Node::Group(group) => group.blank_before,
    }
}

/// Split a sequence at `;` and blocks, and before statement keywords.
fn split_statements(nodes: &[Node]) -> Vec<&[Node]> {
    let mut statements = Vec::new();
    let mut start = 0;
    for (idx, node) in nodes.iter().enumerate() {
        if idx > start && starts_statement(node) {
            statements.push(&nodes[start..idx]);
            start = idx;
        }
        let ends = is_punct(node, ';') || matches!(node, Node::Group(g) if g.block);
        if ends {
            statements.push(&nodes[start..=idx]);
            start = idx + 1;
        }
    }
    if start < nodes.len() {
        statements.push(&nodes[start..]);
    }
    statements
}

/// Split group children at top-level commas, dropping a trailing empty item.
fn split_items(nodes: &[Node]) -> Vec<&[Node]> {
    let mut items: Vec<&[Node]> = nodes.split(|node| is_punct(node, ',')).collect();
    if items.last().map_or(false, |item| item.is_empty()) {
        items.pop();
    }
    items
}

fn flat_sequence(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Node> = None;
    for node in nodes {
        if let Some(prev) = prev {
            if space_between(prev, node) {
                out.push(' ');
            }
        }
        match node {
            Node::Token(token) => out.push_str(&token_text(token)),
            Node::Group(group) => out.push_str(&flat_group(group)),
        }
        prev = Some(node);
    }
    out
}

fn flat_group(group: &Group) -> String {
    let items = split_items(&group.children)
        .into_iter()
        .map(flat_sequence)
        .collect::<Vec<_>>();
    if items.is_empty() {
        format!("{}{}", group.open, group.close)
    } else if group.open == '{' {
        format!("{{ {} }}", items.join(", "))
    } else {
        format!("{}{}{}", group.open, items.join(", "), group.close)
    }
}

fn contains_block(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Group(group) => group.block || contains_block(&group.children),
        Node::Token(_) => false,
    })
}

/// Width of the tokens that follow up to the next group, plus `suffix`
/// when the sequence ends first.
fn trailing_width(rest: &[Node], suffix: usize) -> usize {
    let mut width = 0;
    for node in rest {
        match node {
            Node::Token(token) => width += token_text(token).width(),
            Node::Group(_) => return width,
        }
    }
    width + suffix
}

struct Printer<'a> {
    options: &'a FormatOptions,
    out: String,
}

impl<'a> Printer<'a> {
    fn column(&self) -> usize {
        self.out.rsplit('\n').next().map_or(0, |line| line.width())
    }

    fn newline(&mut self, indent: usize) {
        self.out.push('\n');
        self.out
            .push_str(&" ".repeat(indent * self.options.indent_width));
    }

    fn statements(&mut self, nodes: &[Node], indent: usize) {
        for (idx, statement) in split_statements(nodes).into_iter().enumerate() {
            if idx > 0 {
                if statement.first().map_or(false, blank_before) {
                    self.out.push('\n');
                }
                self.newline(indent);
            }
            self.sequence(statement, indent, 0);
        }
    }

    fn sequence(&mut self, nodes: &[Node], indent: usize, suffix: usize) {
        let mut prev: Option<&Node> = None;
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(prev) = prev {
                if space_between(prev, node) {
                    self.out.push(' ');
                }
            }
            match node {
                Node::Token(token) => self.out.push_str(&token_text(token)),
                Node::Group(group) => {
                    let trailing = trailing_width(&nodes[idx + 1..], suffix);
                    self.group(group, indent, trailing);
                }
            }
            prev = Some(node);
        }
    }

    fn group(&mut self, group: &Group, indent: usize, trailing: usize) {
        if group.block {
            self.out.push(group.open);
            if !group.children.is_empty() {
                self.newline(indent + 1);
                self.statements(&group.children, indent + 1);
                self.newline(indent);
            }
            self.out.push(group.close);
            return;
        }

        let items = split_items(&group.children);
        if items.is_empty() {
            self.out.push(group.open);
            self.out.push(group.close);
            return;
        }

        if !contains_block(&group.children) {
            let flat = flat_group(group);
            if self.column() + flat.width() + trailing <= self.options.print_width {
                self.out.push_str(&flat);
                return;
            }
        }

        if group.open == '(' && items.len() == 1 && items[0].len() == 1 {
            if let Node::Group(inner) = &items[0][0] {
                self.out.push('(');
                self.group(inner, indent, trailing + 1);
                self.out.push(')');
                return;
            }
        }

        self.out.push(group.open);
        for item in items {
            self.newline(indent + 1);
            self.sequence(item, indent + 1, 1);
            self.out.push(',');
        }
        self.newline(indent);
        self.out.push(group.close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow(print_width: usize) -> FormatOptions {
        FormatOptions {
            print_width,
            ..FormatOptions::default()
        }
    }

    #[test]
    fn test_short_module_stays_flat() {
        let text = "import { modules as _modules } from \"./testing\";\n\n\
                    const fixtures = {counter: {id1: _modules.Counter.create({id: \"1\", value: 0})}};\n\n\
                    export default fixtures;";
        let formatted = format_source(text, &FormatOptions::default()).unwrap();
        assert_eq!(
            formatted,
            "import { modules as _modules } from \"./testing\";\n\n\
             const fixtures = { counter: { id1: _modules.Counter.create({ id: \"1\", value: 0 }) } };\n\n\
             export default fixtures;\n"
        );
    }

    #[test]
    fn test_block_always_breaks() {
        let formatted = format_source(
            "export default function get() { return []; }",
            &FormatOptions::default(),
        )
        .unwrap();
        assert_eq!(formatted, "export default function get() {\n    return [];\n}\n");
    }

    #[test]
    fn test_long_groups_break_with_trailing_commas() {
        let formatted = format_source(
            r#"export default function get() { return [{type: "call", args: ["id1"]}]; }"#,
            &narrow(30),
        )
        .unwrap();
        insta::assert_snapshot!(formatted, @r###"
        export default function get() {
            return [
                {
                    type: "call",
                    args: ["id1"],
                },
            ];
        }
        "###);
    }

    #[test]
    fn test_single_object_argument_hugs() {
        let formatted = format_source(
            r#"const a = _modules.Counter.create({id: "id1", value: 0, extra: true});"#,
            &narrow(40),
        )
        .unwrap();
        assert_eq!(
            formatted,
            "const a = _modules.Counter.create({\n    id: \"id1\",\n    value: 0,\n    extra: true,\n});\n"
        );
    }

    #[test]
    fn test_arrow_and_negative_spacing() {
        let formatted = format_source(
            "const x = {fn: (obj: Services) => obj.storage.get, n: -1, d: new Date(0)};",
            &FormatOptions::default(),
        )
        .unwrap();
        assert_eq!(
            formatted,
            "const x = { fn: (obj: Services) => obj.storage.get, n: -1, d: new Date(0) };\n"
        );
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let options = narrow(40);
        let once = format_source(
            r#"export default function get() { return [{type: "call", fn: (obj) => obj.get, args: ["a-long-argument"], returns: undefined}]; }"#,
            &options,
        )
        .unwrap();
        let twice = format_source(&once, &options).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unbalanced_brackets_fail() {
        assert!(format_source("const a = [1, 2;", &FormatOptions::default()).is_err());
        assert!(format_source("const a = 1];", &FormatOptions::default()).is_err());
    }
}
