//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG module text parser.
//!
//! The parser only understands the generic statement grammar of RFC 7950
//! section 6: every statement is a keyword, an optional argument and an
//! optional block of substatements. Statement semantics are handled by the
//! schema compiler.

use crate::error::{Error, Result};

/// Generic YANG statement.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Stmt {
    pub keyword: String,
    pub arg: Option<String>,
    pub substmts: Vec<Stmt>,
    pub line: u64,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Semicolon,
    LeftBrace,
    RightBrace,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u64,
    column: usize,
}

// ===== impl Stmt =====

impl Stmt {
    /// Returns the first substatement with the given keyword.
    pub fn find(&self, keyword: &str) -> Option<&Stmt> {
        self.substmts.iter().find(|stmt| stmt.keyword == keyword)
    }

    /// Returns the argument of the first substatement with the given keyword.
    pub fn arg_of(&self, keyword: &str) -> Option<&str> {
        self.find(keyword).and_then(|stmt| stmt.arg.as_deref())
    }

    /// Returns all substatements with the given keyword.
    pub fn all<'a>(
        &'a self,
        keyword: &'a str,
    ) -> impl Iterator<Item = &'a Stmt> + 'a {
        self.substmts
            .iter()
            .filter(move |stmt| stmt.keyword == keyword)
    }

    /// Returns the statement argument, failing when it's missing.
    pub fn arg(&self) -> Result<&str> {
        self.arg.as_deref().ok_or_else(|| {
            Error::schema(format!(
                "Missing argument of the \"{}\" statement",
                self.keyword
            ))
            .with_line(self.line)
        })
    }
}

// ===== impl Lexer =====

impl Lexer {
    fn new(input: &str) -> Lexer {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else if c == '\t' {
            self.column += 8 - self.column % 8;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, msg: &str) -> Error {
        Error::schema(format!(
            "YANG syntax error: {} (line {})",
            msg, self.line
        ))
        .with_line(self.line)
    }

    fn skip_separators(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(self.error("unterminated comment"))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<(Token, u64)>> {
        self.skip_separators()?;
        let line = self.line;
        let token = match self.peek() {
            None => return Ok(None),
            Some(';') => {
                self.bump();
                Token::Semicolon
            }
            Some('{') => {
                self.bump();
                Token::LeftBrace
            }
            Some('}') => {
                self.bump();
                Token::RightBrace
            }
            Some('"') => Token::Quoted(self.double_quoted()?),
            Some('\'') => Token::Quoted(self.single_quoted()?),
            Some(_) => Token::Word(self.unquoted()),
        };
        Ok(Some((token, line)))
    }

    fn unquoted(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ';' | '{' | '}') {
                break;
            }
            if c == '/' && matches!(self.peek_at(1), Some('/') | Some('*')) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    fn single_quoted(&mut self) -> Result<String> {
        self.bump();
        let mut string = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(string),
                Some(c) => string.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<String> {
        // Column of the first character after the opening quote.
        let indent = self.column + 1;
        self.bump();

        let mut string = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(string),
                Some('\\') => match self.bump() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('"') => string.push('"'),
                    Some('\\') => string.push('\\'),
                    Some(c) => {
                        return Err(self.error(&format!(
                            "invalid escape sequence \"\\{}\"",
                            c
                        )))
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some('\n') => {
                    // Trailing whitespace before a line break is dropped.
                    let trimmed = string.trim_end_matches([' ', '\t']).len();
                    string.truncate(trimmed);
                    string.push('\n');

                    // Strip the indentation up to the opening quote column.
                    while self.column < indent {
                        match self.peek() {
                            Some(' ') | Some('\t') => {
                                self.bump();
                                // A tab crossing the indentation column
                                // leaves the remainder as spaces.
                                for _ in indent..self.column {
                                    string.push(' ');
                                }
                            }
                            _ => break,
                        }
                    }
                }
                Some(c) => string.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, u64)>> {
        let mut tokens = vec![];
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

// ===== statement parser =====

struct Parser {
    tokens: std::iter::Peekable<std::vec::IntoIter<(Token, u64)>>,
}

impl Parser {
    fn error(line: u64, msg: &str) -> Error {
        Error::schema(format!("YANG syntax error: {} (line {})", msg, line))
            .with_line(line)
    }

    fn statement(&mut self) -> Result<Stmt> {
        let (keyword, line) = match self.tokens.next() {
            Some((Token::Word(word), line)) => (word, line),
            Some((token, line)) => {
                return Err(Self::error(
                    line,
                    &format!("unexpected {:?}, expected a keyword", token),
                ))
            }
            None => return Err(Self::error(0, "unexpected end of input")),
        };
        if !is_keyword(&keyword) {
            return Err(Self::error(
                line,
                &format!("invalid keyword \"{}\"", keyword),
            ));
        }

        let arg = match self.tokens.peek() {
            Some((Token::Word(_), _)) => match self.tokens.next() {
                Some((Token::Word(word), _)) => Some(word),
                _ => None,
            },
            Some((Token::Quoted(_), _)) => Some(self.quoted_argument()?),
            _ => None,
        };

        let mut stmt = Stmt {
            keyword,
            arg,
            substmts: vec![],
            line,
        };
        match self.tokens.next() {
            Some((Token::Semicolon, _)) => {}
            Some((Token::LeftBrace, _)) => loop {
                match self.tokens.peek() {
                    Some((Token::RightBrace, _)) => {
                        self.tokens.next();
                        break;
                    }
                    Some(_) => stmt.substmts.push(self.statement()?),
                    None => {
                        return Err(Self::error(
                            line,
                            &format!(
                                "missing closing brace of \"{}\"",
                                stmt.keyword
                            ),
                        ))
                    }
                }
            },
            Some((token, line)) => {
                return Err(Self::error(
                    line,
                    &format!(
                        "unexpected {:?} after \"{}\"",
                        token, stmt.keyword
                    ),
                ))
            }
            None => {
                return Err(Self::error(line, "unexpected end of input"));
            }
        }

        Ok(stmt)
    }

    fn quoted_argument(&mut self) -> Result<String> {
        let mut arg = match self.tokens.next() {
            Some((Token::Quoted(string), _)) => string,
            _ => unreachable!(),
        };
        // Concatenation: "a" + "b".
        while matches!(
            self.tokens.peek(),
            Some((Token::Word(w), _)) if w == "+"
        ) {
            self.tokens.next();
            match self.tokens.next() {
                Some((Token::Quoted(string), _)) => arg.push_str(&string),
                Some((_, line)) => {
                    return Err(Self::error(
                        line,
                        "expected a quoted string after \"+\"",
                    ))
                }
                None => return Err(Self::error(0, "unexpected end of input")),
            }
        }
        Ok(arg)
    }
}

fn is_keyword(word: &str) -> bool {
    let mut parts = word.splitn(2, ':');
    let first = parts.next().unwrap_or("");
    let identifier = |s: &str| crate::utils::is_identifier(s);
    match parts.next() {
        Some(second) => identifier(first) && identifier(second),
        None => identifier(first),
    }
}

/// Parse a YANG module (or submodule) into its statement tree.
pub(crate) fn parse(input: &str) -> Result<Stmt> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
    };

    let stmt = parser.statement()?;
    if stmt.keyword != "module" && stmt.keyword != "submodule" {
        return Err(Error::schema(format!(
            "Invalid keyword \"{}\", expected \"module\" or \"submodule\"",
            stmt.keyword
        ))
        .with_line(stmt.line));
    }
    if let Some((_, line)) = parser.tokens.next() {
        return Err(Parser::error(line, "trailing content after module"));
    }

    Ok(stmt)
}
