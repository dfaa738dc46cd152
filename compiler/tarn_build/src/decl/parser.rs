//! Line-oriented parser for declaration files.
//!
//! Every non-blank, non-comment line is one statement:
//!
//! ```text
//! module NAME
//! [pub] type NAME[A, B] [where CONSTRAINT, ...]
//! [pub] field NAME TYPE
//! [pub] fun NAME(p TYPE, ...) [TYPE] [require CLAUSE]
//!
//! TYPE := NAME(.NAME)*[TYPE, ...] | (TYPE, ...) | (label TYPE, ...)
//! ```
//!
//! Parsing happens in two steps: the token rows are read to produce the
//! tree and a list of edits (kind retags, errors, statement ends), then the
//! edits are applied to the lexer.

use tarn_lexer::{Annotation, Lexer, Location, Token, TokenKind};

use crate::frontend::ParseOutput;

/// Identifiers, including ones an earlier parse of the same lexer retagged.
fn is_name(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Identifier | TokenKind::DefineName | TokenKind::TypeName
    )
}

/// A name and the location of its token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name {
    pub text: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    /// `a.b.Name` with optional `[args]`; `location` is the first segment.
    Named {
        path: String,
        location: Location,
        args: Vec<TypeExpr>,
    },
    Tuple {
        location: Location,
        fields: Vec<TupleFieldExpr>,
    },
}

impl TypeExpr {
    pub fn location(&self) -> Location {
        match self {
            TypeExpr::Named { location, .. } | TypeExpr::Tuple { location, .. } => *location,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleFieldExpr {
    pub label: Option<Name>,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Module,
    Type {
        generics: Vec<Name>,
        constraints: Vec<String>,
    },
    Field {
        ty: TypeExpr,
    },
    Function {
        params: Vec<Param>,
        returns: Option<TypeExpr>,
        requires: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decl {
    pub name: Name,
    pub kind: DeclKind,
    pub is_pub: bool,
    /// Text of the `//` lines directly above.
    pub comments: Vec<String>,
}

/// The declarations of one file, in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclTree {
    pub decls: Vec<Decl>,
}

type ParseResult<T> = Result<T, (Location, String)>;

/// Parse `lexer`, retagging names and annotating errors in place.
pub fn parse(lexer: &mut Lexer) -> ParseOutput<DeclTree> {
    let mut tree = DeclTree::default();
    let mut edits = Edits::default();
    let mut comments = Vec::new();

    for row in lexer.token_rows() {
        let mut code = Vec::new();
        let mut comment = None;
        for token in row {
            if token.kind == TokenKind::Comment {
                comment = Some(token);
            } else {
                code.push(token);
            }
        }
        let Some(last) = code.last() else {
            match comment {
                Some(token) => comments.push(comment_text(token)),
                None => comments.clear(),
            }
            continue;
        };
        edits
            .statement_ends
            .push(Location::new(last.line(), last.end_column()));

        let mut line = LineParser::new(&code);
        match line.statement() {
            Ok((name, kind, is_pub)) => tree.decls.push(Decl {
                name,
                kind,
                is_pub,
                comments: std::mem::take(&mut comments),
            }),
            Err(error) => {
                comments.clear();
                edits.errors.push(error);
            }
        }
        edits.retags.append(&mut line.retags);
    }

    let error_count = edits.apply(lexer);
    ParseOutput { tree, error_count }
}

fn comment_text(token: &Token) -> String {
    token.name().trim_start_matches('/').trim().to_string()
}

#[derive(Default)]
struct Edits {
    retags: Vec<(Location, TokenKind)>,
    errors: Vec<(Location, String)>,
    statement_ends: Vec<Location>,
}

impl Edits {
    /// Returns the number of errors stamped.
    fn apply(self, lexer: &mut Lexer) -> usize {
        for (location, kind) in self.retags {
            if let Some(token) = lexer.token_at_mut(location) {
                token.kind = kind;
            }
        }
        let mut count = 0;
        for (location, message) in self.errors {
            if let Some(token) = lexer.token_at_mut(location) {
                if token.add_annotation(Annotation::ParseError(message)) {
                    count += 1;
                }
            }
        }
        for end in self.statement_ends {
            lexer.add_meta_token(Token::meta(";", end));
        }
        count
    }
}

struct LineParser<'a> {
    tokens: &'a [&'a Token],
    pos: usize,
    retags: Vec<(Location, TokenKind)>,
}

impl<'a> LineParser<'a> {
    fn new(tokens: &'a [&'a Token]) -> Self {
        LineParser {
            tokens,
            pos: 0,
            retags: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.name() == text)
    }

    fn eat(&mut self, text: &str) -> bool {
        let found = self.at(text);
        if found {
            self.pos += 1;
        }
        found
    }

    /// An error at the current token, or at the last token of the line.
    fn error<T>(&self, message: impl Into<String>) -> ParseResult<T> {
        let location = self
            .peek()
            .or_else(|| self.tokens.last().copied())
            .map(Token::location)
            .unwrap_or_default();
        Err((location, message.into()))
    }

    fn expected<T>(&self, what: &str) -> ParseResult<T> {
        match self.peek() {
            Some(token) => self.error(format!("Expected {what}, found `{}`", token.name())),
            None => self.error(format!("Expected {what} at end of line")),
        }
    }

    fn expect(&mut self, text: &str) -> ParseResult<()> {
        if self.eat(text) {
            Ok(())
        } else {
            self.expected(&format!("`{text}`"))
        }
    }

    fn ident(&mut self, what: &str, retag: Option<TokenKind>) -> ParseResult<Name> {
        match self.peek() {
            Some(token) if is_name(token) => {
                self.pos += 1;
                if let Some(kind) = retag {
                    self.retags.push((token.location(), kind));
                }
                Ok(Name {
                    text: token.name().to_string(),
                    location: token.location(),
                })
            }
            _ => self.expected(what),
        }
    }

    /// Remaining tokens joined by single spaces.
    fn rest(&mut self) -> String {
        let text: Vec<&str> = self.tokens[self.pos..].iter().map(|t| t.name()).collect();
        self.pos = self.tokens.len();
        text.join(" ")
    }

    fn finish(&self) -> ParseResult<()> {
        match self.peek() {
            Some(token) => self.error(format!("Unexpected `{}`", token.name())),
            None => Ok(()),
        }
    }

    fn statement(&mut self) -> ParseResult<(Name, DeclKind, bool)> {
        let is_pub = self.eat("pub");
        let Some(keyword) = self.bump() else {
            return self.expected("a declaration");
        };
        let (name, kind) = match keyword.name() {
            "module" if !is_pub => {
                let name = self.ident("a module name", Some(TokenKind::DefineName))?;
                (name, DeclKind::Module)
            }
            "module" => {
                self.pos -= 1;
                return self.error("Modules cannot be `pub`");
            }
            "type" => self.type_decl()?,
            "field" => {
                let name = self.ident("a field name", Some(TokenKind::DefineName))?;
                let ty = self.type_expr()?;
                (name, DeclKind::Field { ty })
            }
            "fun" => self.fun_decl()?,
            other => {
                self.pos -= 1;
                return self.error(format!("Unknown declaration `{other}`"));
            }
        };
        self.finish()?;
        Ok((name, kind, is_pub))
    }

    fn type_decl(&mut self) -> ParseResult<(Name, DeclKind)> {
        let name = self.ident("a type name", Some(TokenKind::DefineName))?;
        let mut generics = Vec::new();
        if self.eat("[") {
            loop {
                generics.push(self.ident("a type parameter", Some(TokenKind::TypeName))?);
                if self.eat("]") {
                    break;
                }
                self.expect(",")?;
            }
        }
        let mut constraints = Vec::new();
        if self.eat("where") {
            if self.peek().is_none() {
                return self.expected("a constraint");
            }
            constraints = self
                .rest()
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        Ok((
            name,
            DeclKind::Type {
                generics,
                constraints,
            },
        ))
    }

    fn fun_decl(&mut self) -> ParseResult<(Name, DeclKind)> {
        let name = self.ident("a function name", Some(TokenKind::DefineName))?;
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.eat(")") {
            loop {
                let param = self.ident("a parameter name", Some(TokenKind::DefineName))?;
                let ty = self.type_expr()?;
                params.push(Param { name: param, ty });
                if self.eat(")") {
                    break;
                }
                self.expect(",")?;
            }
        }
        let returns = match self.peek() {
            Some(token) if token.name() != "require" => Some(self.type_expr()?),
            _ => None,
        };
        let requires = if self.eat("require") {
            if self.peek().is_none() {
                return self.expected("a require clause");
            }
            Some(self.rest())
        } else {
            None
        };
        Ok((
            name,
            DeclKind::Function {
                params,
                returns,
                requires,
            },
        ))
    }

    fn type_expr(&mut self) -> ParseResult<TypeExpr> {
        match self.peek() {
            Some(open) if open.name() == "(" => {
                self.pos += 1;
                let mut fields = Vec::new();
                if !self.eat(")") {
                    loop {
                        fields.push(self.tuple_field()?);
                        if self.eat(")") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                Ok(TypeExpr::Tuple {
                    location: open.location(),
                    fields,
                })
            }
            Some(token) if is_name(token) => self.named_type(),
            _ => self.expected("a type"),
        }
    }

    /// `label TYPE` when two names (or a name and a tuple) follow each other.
    fn tuple_field(&mut self) -> ParseResult<TupleFieldExpr> {
        let labeled = self.peek().is_some_and(is_name)
            && self
                .peek_at(1)
                .is_some_and(|t| is_name(t) || t.name() == "(");
        let label = if labeled {
            Some(self.ident("a field label", None)?)
        } else {
            None
        };
        let ty = self.type_expr()?;
        Ok(TupleFieldExpr { label, ty })
    }

    fn named_type(&mut self) -> ParseResult<TypeExpr> {
        let first = self.ident("a type", Some(TokenKind::TypeName))?;
        let location = first.location;
        let mut path = first.text;
        while self.eat(".") {
            let segment = self.ident("a type name", Some(TokenKind::TypeName))?;
            path.push('.');
            path.push_str(&segment.text);
        }
        let mut args = Vec::new();
        if self.eat("[") {
            loop {
                args.push(self.type_expr()?);
                if self.eat("]") {
                    break;
                }
                self.expect(",")?;
            }
        }
        Ok(TypeExpr::Named {
            path,
            location,
            args,
        })
    }
}
