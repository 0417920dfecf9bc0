//! A deliberately small C# declaration scanner.
//!
//! It knows about namespaces, types and methods and where their bodies start
//! and end, which is all test selection needs. It is not a parser: a member
//! is only recognised when its name and opening parenthesis share a line.

use super::{Position, SymbolResolver};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*namespace\s+(?P<name>[\w.]+)\s*(?P<scoped>;)?").unwrap());

static TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|struct|interface|record(?:\s+class|\s+struct)?)\s+(?P<name>\w+)").unwrap()
});

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|async|virtual|override|sealed|abstract|extern|unsafe|new|partial|readonly)\s+)*(?P<ret>[\w.]+(?:<[^()]*?>)?(?:\[\])?\??)\s+(?P<name>\w+)\s*(?:<[^()]*?>)?\s*\(",
    )
    .unwrap()
});

/// A constructor header like `public Foo(` leaves one of these in the return type slot.
const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "async", "virtual", "override",
    "sealed", "abstract", "extern", "unsafe", "partial", "readonly",
];

const NOT_A_RETURN_TYPE: &[&str] = &[
    "return", "new", "throw", "await", "else", "case", "goto", "yield", "using", "in", "is", "as",
    "out", "ref", "var", "const", "event", "delegate", "operator",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Namespace,
    Type,
    Method,
}

/// One declaration with the span from its header to its closing brace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Fully qualified; methods carry a `()` suffix.
    pub name: String,
    pub start: Position,
    pub end: Position,
}

impl Declaration {
    pub fn contains(&self, at: Position) -> bool {
        self.start <= at && at <= self.end
    }
}

#[derive(Debug, Default, Clone)]
pub struct SourceOutline {
    declarations: Vec<Declaration>,
}

struct Pending {
    kind: DeclarationKind,
    name: String,
    start: Position,
}

struct Frame {
    declaration: Option<usize>,
}

impl SourceOutline {
    pub fn parse(source: &str) -> Self {
        let code = strip_comments_and_literals(source);
        let mut declarations: Vec<Declaration> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut file_namespace: Option<String> = None;
        let mut pending: Option<Pending> = None;

        for (line_no, line) in code.lines().enumerate() {
            let line_no = line_no as u32;
            let scope = scope_kind(&stack, &declarations);

            if let Some(caps) = NAMESPACE.captures(line) {
                if caps.name("scoped").is_some() {
                    file_namespace = Some(caps["name"].to_string());
                    continue;
                }
            }

            let owner = owning_type_name(&stack, &declarations);
            let mut starts = find_declarations(line, scope, owner);
            starts.reverse();

            for (col, ch) in line.chars().enumerate() {
                let col = col as u32;
                while starts.last().is_some_and(|(at, _, _)| *at <= col) {
                    if let Some((at, kind, name)) = starts.pop() {
                        pending = Some(Pending {
                            kind,
                            name,
                            start: Position::new(line_no, at),
                        });
                    }
                }

                match ch {
                    '{' => {
                        let declaration = pending.take().map(|p| {
                            let name = qualify(&file_namespace, &stack, &declarations, &p);
                            declarations.push(Declaration {
                                kind: p.kind,
                                name,
                                start: p.start,
                                end: p.start,
                            });
                            declarations.len() - 1
                        });
                        stack.push(Frame { declaration });
                    }
                    '}' => {
                        if let Some(Frame {
                            declaration: Some(idx),
                        }) = stack.pop()
                        {
                            declarations[idx].end = Position::new(line_no, col);
                        }
                    }
                    ';' => {
                        // Abstract and expression-bodied members end here.
                        if let Some(p) = pending.take() {
                            if p.kind == DeclarationKind::Method {
                                let name = qualify(&file_namespace, &stack, &declarations, &p);
                                declarations.push(Declaration {
                                    kind: p.kind,
                                    name,
                                    start: p.start,
                                    end: Position::new(line_no, col),
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Self { declarations }
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Innermost declaration of `kind` whose span contains `at`.
    pub fn enclosing(&self, kind: DeclarationKind, at: Position) -> Option<&Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.kind == kind && d.contains(at))
            .max_by_key(|d| d.start)
    }

    pub fn first_type(&self) -> Option<&Declaration> {
        self.declarations
            .iter()
            .filter(|d| d.kind == DeclarationKind::Type)
            .min_by_key(|d| d.start)
    }
}

/// What the innermost open brace belongs to, which decides what may be declared next.
fn scope_kind(stack: &[Frame], declarations: &[Declaration]) -> Option<DeclarationKind> {
    match stack.last() {
        None => Some(DeclarationKind::Namespace),
        Some(Frame {
            declaration: Some(idx),
        }) => Some(declarations[*idx].kind),
        Some(Frame { declaration: None }) => None,
    }
}

/// Unqualified name of the type whose body is the innermost open brace.
fn owning_type_name<'a>(stack: &[Frame], declarations: &'a [Declaration]) -> Option<&'a str> {
    let idx = stack.last()?.declaration?;
    let declaration = &declarations[idx];
    (declaration.kind == DeclarationKind::Type)
        .then(|| declaration.name.rsplit('.').next().unwrap_or(&declaration.name))
}

fn find_declarations(
    line: &str,
    scope: Option<DeclarationKind>,
    owner: Option<&str>,
) -> Vec<(u32, DeclarationKind, String)> {
    let mut found = Vec::new();
    let char_col = |byte: usize| line[..byte].chars().count() as u32;

    match scope {
        Some(DeclarationKind::Namespace) => {
            if let Some(caps) = NAMESPACE.captures(line) {
                let at = caps.name("name").map_or(0, |m| m.start());
                found.push((char_col(at), DeclarationKind::Namespace, caps["name"].to_string()));
            }
            found.extend(types_in(line, char_col));
        }
        Some(DeclarationKind::Type) => {
            found.extend(types_in(line, char_col));
            if found.is_empty() {
                if let Some(caps) = METHOD.captures(line) {
                    let ret = &caps["ret"];
                    let name = &caps["name"];
                    let constructor = MODIFIERS.contains(&ret) || owner == Some(name);
                    if !constructor
                        && !NOT_A_RETURN_TYPE.contains(&ret)
                        && !NOT_A_RETURN_TYPE.contains(&name)
                    {
                        let at = line.len() - line.trim_start().len();
                        found.push((char_col(at), DeclarationKind::Method, name.to_string()));
                    }
                }
            }
        }
        _ => {}
    }

    found.sort_by_key(|(at, _, _)| *at);
    found
}

fn types_in(
    line: &str,
    char_col: impl Fn(usize) -> u32,
) -> impl Iterator<Item = (u32, DeclarationKind, String)> {
    TYPE.captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((char_col(whole.start()), DeclarationKind::Type, caps["name"].to_string()))
        })
        .collect::<Vec<_>>()
        .into_iter()
}

fn qualify(
    file_namespace: &Option<String>,
    stack: &[Frame],
    declarations: &[Declaration],
    pending: &Pending,
) -> String {
    let enclosing = stack
        .iter()
        .rev()
        .find_map(|f| f.declaration)
        .map(|idx| declarations[idx].name.as_str())
        .or(file_namespace.as_deref());

    let mut name = match enclosing {
        Some(prefix) => format!("{prefix}.{}", pending.name),
        None => pending.name.clone(),
    };
    if pending.kind == DeclarationKind::Method {
        name.push_str("()");
    }
    name
}

#[derive(Clone, Copy, PartialEq)]
enum Lexer {
    Code,
    LineComment,
    BlockComment,
    Str,
    Verbatim,
    Char,
}

/// Blank out comments and string/char literals, keeping line and column
/// positions intact, so braces and keywords inside them are ignored.
fn strip_comments_and_literals(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut state = Lexer::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if c == '\n' {
            out.push('\n');
            if state == Lexer::LineComment || state == Lexer::Str || state == Lexer::Char {
                state = Lexer::Code;
            }
            i += 1;
            continue;
        }

        match state {
            Lexer::Code => match (c, next) {
                ('/', Some('/')) => state = Lexer::LineComment,
                ('/', Some('*')) => state = Lexer::BlockComment,
                ('@', Some('"')) | ('$', Some('@')) | ('@', Some('$')) => {
                    state = Lexer::Verbatim;
                    out.push(' ');
                    i += 1;
                    while i < chars.len() && chars[i] != '"' {
                        out.push(' ');
                        i += 1;
                    }
                }
                ('"', _) => state = Lexer::Str,
                ('\'', _) => state = Lexer::Char,
                _ => {
                    out.push(c);
                    i += 1;
                    continue;
                }
            },
            Lexer::LineComment => {}
            Lexer::BlockComment => {
                if c == '*' && next == Some('/') {
                    out.push_str("  ");
                    i += 2;
                    state = Lexer::Code;
                    continue;
                }
            }
            Lexer::Str | Lexer::Char => {
                let close = if state == Lexer::Str { '"' } else { '\'' };
                if c == '\\' && next.is_some_and(|n| n != '\n') {
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                if c == close {
                    state = Lexer::Code;
                }
            }
            Lexer::Verbatim => {
                if c == '"' && next == Some('"') {
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                if c == '"' {
                    state = Lexer::Code;
                }
            }
        }

        out.push(' ');
        i += 1;
    }
    out
}

/// [`SymbolResolver`] that reads the file from disk and scans it with [`SourceOutline`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlineResolver;

impl OutlineResolver {
    fn outline(file: &Path) -> Option<SourceOutline> {
        match fs::read_to_string(file) {
            Ok(source) => Some(SourceOutline::parse(&source)),
            Err(e) => {
                debug!(file = %file.display(), error = %e, "cannot read source for symbol lookup");
                None
            }
        }
    }
}

impl SymbolResolver for OutlineResolver {
    fn enclosing_method(&self, file: &Path, at: Position) -> Option<String> {
        let outline = Self::outline(file)?;
        outline
            .enclosing(DeclarationKind::Method, at)
            .map(|d| d.name.clone())
    }

    fn enclosing_type(&self, file: &Path, at: Position) -> Option<String> {
        let outline = Self::outline(file)?;
        outline
            .enclosing(DeclarationKind::Type, at)
            .map(|d| d.name.clone())
    }

    fn first_type(&self, file: &Path) -> Option<String> {
        let outline = Self::outline(file)?;
        outline.first_type().map(|d| d.name.clone())
    }
}
