//! Parser for the SavedVariables assignment `[local] Name = { ... }`
//!
//! A single left-to-right pass over the token stream with one token of
//! lookahead (two to tell `"k" = v` from a positional string). Nested tables
//! are tracked on an explicit stack, so nesting depth is limited by memory
//! rather than by the call stack.

use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};
use crate::value::{f64_to_i64, Field, Key, Value};

/// The parsed assignment statement
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assigned variable name (e.g. "MythicPlusStatsDB")
    pub name: String,
    /// Right-hand side, always a `Value::Table`
    pub value: Value,
}

/// Parse the assignment and return its right-hand side table
pub fn parse(src: &str) -> Result<Value, ParseError> {
    parse_assignment(src).map(|a| a.value)
}

/// Parse the assignment, keeping the assigned name
pub fn parse_assignment(src: &str) -> Result<Assignment, ParseError> {
    let tokens = lex(src)?;
    let mut parser = Parser::new(&tokens);

    parser.eat(&Token::Local);
    let name = match parser.peek() {
        Token::Ident(name) => name.clone(),
        _ => return Err(parser.unexpected("variable name")),
    };
    parser.bump();
    parser.expect(&Token::Eq, "'='")?;
    let value = parser.parse_table()?;
    parser.expect(&Token::Eof, "end of input")?;

    Ok(Assignment { name, value })
}

/// A table under construction
struct Frame {
    fields: Vec<Field>,
    /// Next implicit key for positional fields, counted per table
    next_index: i64,
    /// A field was just completed and must be followed by a separator or '}'
    needs_separator: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            next_index: 1,
            needs_separator: false,
        }
    }

    fn push(&mut self, key: Key, value: Value) {
        self.fields.push(Field::new(key, value));
        self.needs_separator = true;
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        // The stream always ends with Eof; clamp lookahead to it
        let i = (self.pos + n).min(self.tokens.len().saturating_sub(1));
        self.tokens.get(i).map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.offset)
            .unwrap_or(0)
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(self.offset(), expected, self.peek().to_string())
    }

    /// Parse a table, including every table nested inside it
    fn parse_table(&mut self) -> Result<Value, ParseError> {
        self.expect(&Token::LBrace, "'{'")?;

        // Enclosing frames, each with the key its child table will be stored under
        let mut parents: Vec<(Frame, Key)> = Vec::new();
        let mut current = Frame::new();

        loop {
            if current.needs_separator {
                match self.peek() {
                    Token::Comma | Token::Semicolon => {
                        self.bump();
                        current.needs_separator = false;
                    }
                    Token::RBrace => {}
                    _ => return Err(self.unexpected("',' or '}'")),
                }
            }

            if self.eat(&Token::RBrace) {
                let table = Value::Table(current.fields);
                match parents.pop() {
                    None => return Ok(table),
                    Some((mut parent, key)) => {
                        parent.push(key, table);
                        current = parent;
                    }
                }
                continue;
            }

            let key = self.parse_key(&mut current)?;

            if self.eat(&Token::LBrace) {
                parents.push((std::mem::replace(&mut current, Frame::new()), key));
                continue;
            }

            let value = self.parse_scalar()?;
            current.push(key, value);
        }
    }

    /// Parse an explicit `[k] =` / `"k" =` prefix, or assign the next
    /// positional index
    fn parse_key(&mut self, frame: &mut Frame) -> Result<Key, ParseError> {
        match self.peek().clone() {
            Token::LBracket => {
                self.bump();
                let key_offset = self.offset();
                let key = match self.peek().clone() {
                    Token::Str(s) => Key::String(s),
                    Token::Integer(i) => Key::Index(i),
                    Token::Number(n) => match f64_to_i64(n) {
                        Some(i) => Key::Index(i),
                        None => {
                            return Err(ParseError::new(
                                key_offset,
                                "integer key",
                                format!("number {}", n),
                            ))
                        }
                    },
                    _ => return Err(self.unexpected("string or integer key")),
                };
                self.bump();
                self.expect(&Token::RBracket, "']'")?;
                self.expect(&Token::Eq, "'='")?;
                Ok(key)
            }
            Token::Str(s) if *self.peek_nth(1) == Token::Eq => {
                self.bump();
                self.bump();
                Ok(Key::String(s))
            }
            Token::Ident(name) if *self.peek_nth(1) == Token::Eq => Err(ParseError::new(
                self.offset(),
                "quoted field key",
                format!("bare key `{}`", name),
            )),
            Token::Eof => Err(self.unexpected("field or '}'")),
            _ => {
                let key = Key::Index(frame.next_index);
                frame.next_index += 1;
                Ok(key)
            }
        }
    }

    fn parse_scalar(&mut self) -> Result<Value, ParseError> {
        let value = match self.peek() {
            Token::Str(s) => Value::String(s.clone()),
            Token::Integer(i) => Value::Number(*i as f64),
            Token::Number(n) => Value::Number(*n),
            Token::True => Value::Boolean(true),
            Token::False => Value::Boolean(false),
            Token::Nil => Value::Nil,
            _ => return Err(self.unexpected("value")),
        };
        self.bump();
        Ok(value)
    }
}
