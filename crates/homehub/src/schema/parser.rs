// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service definition parser
//!
//! Parses the compact definition language devices upload at registration:
//!
//! ```text
//! // line comments are allowed
//! message Color {
//!     uint32 red;
//!     uint32 green;
//!     optional uint32 alpha;
//!     string label optional;
//! };
//!
//! inbound service SetColor(Color) : bool;
//! outbound service Pressed(int32, int32);
//! service Toggle() : bool;
//! ```
//!
//! Field modifiers (`required`, `optional`) may appear before the type or
//! after the field name. Type names that are not scalar keywords must name a
//! message declared anywhere in the same payload.

use super::types::{Field, Message, Scalar, Service, Type};
use super::{Declaration, Schema};
use crate::error::{ParseError, ParseErrorKind};
use std::collections::HashSet;

const KW_MESSAGE: &str = "message";
const KW_SERVICE: &str = "service";
const KW_INBOUND: &str = "inbound";
const KW_OUTBOUND: &str = "outbound";
const KW_REQUIRED: &str = "required";
const KW_OPTIONAL: &str = "optional";

const RESERVED: [&str; 6] = [
    KW_MESSAGE,
    KW_SERVICE,
    KW_INBOUND,
    KW_OUTBOUND,
    KW_REQUIRED,
    KW_OPTIONAL,
];

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word) || Scalar::from_keyword(word).is_some()
}

/// Parse a raw definition payload into a schema.
pub fn parse(input: &[u8]) -> Result<Schema, ParseError> {
    // Invalid UTF-8 becomes U+FFFD, which the lexer rejects with a position.
    let text = String::from_utf8_lossy(input);
    Parser::new(&text)?.parse_schema()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Comma,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Identifier(word) => format!("'{}'", word),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.next_char();
                }
                Some('/') if self.input[self.pos..].starts_with("//") => {
                    while let Some(ch) = self.next_char() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.next_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);
        let spanned = |token| Spanned {
            token,
            line,
            column,
        };

        let ch = match self.peek_char() {
            Some(c) => c,
            None => return Ok(spanned(Token::Eof)),
        };

        if ch.is_alphabetic() || ch == '_' {
            let ident = self.read_identifier();
            return Ok(spanned(Token::Identifier(ident)));
        }

        let token = match ch {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            other => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedChar(other),
                    line,
                    column,
                ))
            }
        };
        self.next_char();
        Ok(spanned(token))
    }
}

/// A reference type waiting to be resolved against the declared messages.
struct PendingReference {
    name: String,
    line: usize,
    column: usize,
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Spanned,
    message_names: HashSet<String>,
    service_names: HashSet<String>,
    references: Vec<PendingReference>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            message_names: HashSet::new(),
            service_names: HashSet::new(),
            references: Vec::new(),
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.current.line, self.current.column)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current.token {
            Token::Eof => self.error(ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            }),
            ref found => self.error(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.describe(),
            }),
        }
    }

    fn current_word(&self) -> Option<&str> {
        match &self.current.token {
            Token::Identifier(word) => Some(word.as_str()),
            _ => None,
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.current.token == token {
            self.advance()
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    /// Consume a declaration or field name.
    fn expect_name(&mut self) -> Result<(String, usize, usize), ParseError> {
        let (line, column) = (self.current.line, self.current.column);
        let name = match self.current_word() {
            Some(word) if is_reserved(word) => {
                return Err(self.error(ParseErrorKind::ReservedName(word.to_string())))
            }
            Some(word) => word.to_string(),
            None => return Err(self.unexpected("a name")),
        };
        self.advance()?;
        Ok((name, line, column))
    }

    fn parse_schema(mut self) -> Result<Schema, ParseError> {
        let mut declarations = Vec::new();

        while self.current.token != Token::Eof {
            declarations.push(self.parse_declaration()?);
        }

        if declarations.is_empty() {
            return Err(self.error(ParseErrorKind::EmptySchema));
        }

        for reference in &self.references {
            if !self.message_names.contains(&reference.name) {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownType(reference.name.clone()),
                    reference.line,
                    reference.column,
                ));
            }
        }

        Ok(Schema { declarations })
    }

    fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let mut inbound = false;
        let mut outbound = false;

        loop {
            match self.current_word() {
                Some(KW_INBOUND) => inbound = true,
                Some(KW_OUTBOUND) => outbound = true,
                _ => break,
            }
            self.advance()?;
        }

        match self.current_word() {
            Some(KW_SERVICE) => {
                let mut service = self.parse_service()?;
                service.inbound = inbound;
                service.outbound = outbound;
                Ok(Declaration::Service(service))
            }
            Some(KW_MESSAGE) if !inbound && !outbound => {
                Ok(Declaration::Message(self.parse_message()?))
            }
            _ if inbound || outbound => Err(self.unexpected("'service'")),
            _ => Err(self.unexpected("'message' or 'service'")),
        }
    }

    fn parse_message(&mut self) -> Result<Message, ParseError> {
        self.advance()?; // 'message'
        let (name, line, column) = self.expect_name()?;
        if !self.message_names.insert(name.clone()) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateMessage(name),
                line,
                column,
            ));
        }

        self.expect(Token::LBrace)?;

        let mut message = Message::new(name);
        let mut field_names = HashSet::new();

        while self.current.token != Token::RBrace {
            if self.current.token == Token::Eof {
                return Err(self.unexpected("a field or '}'"));
            }
            let (field, line, column) = self.parse_field()?;
            if !field_names.insert(field.name.clone()) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateField {
                        message: message.name.clone(),
                        field: field.name,
                    },
                    line,
                    column,
                ));
            }
            message = message.with_field(field);
        }
        self.advance()?; // '}'

        if self.current.token == Token::Semicolon {
            self.advance()?;
        }

        Ok(message)
    }

    fn parse_modifiers(&mut self, field: &mut Field) -> Result<(), ParseError> {
        loop {
            match self.current_word() {
                Some(KW_REQUIRED) => field.required = true,
                Some(KW_OPTIONAL) => field.optional = true,
                _ => return Ok(()),
            }
            self.advance()?;
        }
    }

    fn parse_field(&mut self) -> Result<(Field, usize, usize), ParseError> {
        let mut field = Field::new(String::new(), Type::Scalar(Scalar::Bool));
        self.parse_modifiers(&mut field)?;

        field.ty = self.parse_type()?;
        let (name, line, column) = self.expect_name()?;
        field.name = name;

        self.parse_modifiers(&mut field)?;
        self.expect(Token::Semicolon)?;

        Ok((field, line, column))
    }

    fn parse_service(&mut self) -> Result<Service, ParseError> {
        self.advance()?; // 'service'
        let (name, line, column) = self.expect_name()?;
        if !self.service_names.insert(name.clone()) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateService(name),
                line,
                column,
            ));
        }

        let mut service = Service::new(name);

        self.expect(Token::LParen)?;
        if self.current.token != Token::RParen {
            loop {
                service.request.push(self.parse_type()?);
                if self.current.token != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(Token::RParen)?;

        if self.current.token == Token::Colon {
            self.advance()?;
            service.response = Some(self.parse_type()?);
        }

        self.expect(Token::Semicolon)?;
        Ok(service)
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let (line, column) = (self.current.line, self.current.column);
        let word = match self.current_word() {
            Some(word) => word.to_string(),
            None => return Err(self.unexpected("a type")),
        };

        let ty = if let Some(scalar) = Scalar::from_keyword(&word) {
            Type::Scalar(scalar)
        } else if RESERVED.contains(&word.as_str()) {
            return Err(self.unexpected("a type"));
        } else {
            self.references.push(PendingReference {
                name: word.clone(),
                line,
                column,
            });
            Type::Reference(word)
        };

        self.advance()?;
        Ok(ty)
    }
}
