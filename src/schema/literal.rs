//! Reader for legacy literal-syntax schema files.
//!
//! Older schema files are written as a literal list of records, e.g.
//!
//! ```text
//! [{'name': 'id', 'type': 'INTEGER', 'mode': 'REQUIRED'},
//!  {'name': 'label', 'type': 'STRING', 'description': None},]
//! ```
//!
//! The text is tokenized and converted into a [`serde_json::Value`]; it is
//! never evaluated. Only lists, tuples, dicts, quoted strings, numbers,
//! `None`, `True` and `False` are understood.

use serde_json::{Map, Number, Value};

/// Deepest nesting of lists, tuples and dicts accepted
const MAX_NESTING: usize = 128;

/// Syntax error with the byte offset at which it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

/// Parse a complete literal document
pub fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        src: text,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl LiteralParser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and `#` comments
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            Some(open @ ('[' | '(' | '{')) => {
                if self.depth >= MAX_NESTING {
                    return Err(self.error(format!("nesting deeper than {} levels", MAX_NESTING)));
                }
                self.bump();
                self.depth += 1;
                let value = match open {
                    '[' => self.parse_sequence(']'),
                    '(' => self.parse_sequence(')'),
                    _ => self.parse_dict(),
                };
                self.depth -= 1;
                value
            }
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                self.parse_string(quote).map(Value::String)
            }
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(Value::Array(items)),
                Some(c) => return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c))),
                None => return Err(self.error(format!("unterminated sequence, expected '{}'", close))),
            }
        }
    }

    fn parse_dict(&mut self) -> Result<Value, LiteralError> {
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(quote @ ('\'' | '"')) => {
                    self.bump();
                    let key = self.parse_string(quote)?;
                    self.skip_trivia();
                    if self.bump() != Some(':') {
                        return Err(self.error(format!("expected ':' after key '{}'", key)));
                    }
                    let value = self.parse_value()?;
                    map.insert(key, value);
                }
                Some(_) => return Err(self.error("dict keys must be quoted strings")),
                None => return Err(self.error("unterminated dict")),
            }
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated dict")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some('\n') => {}
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some('\n') => return Err(self.error("newline in string literal")),
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_') {
                self.bump();
            } else {
                break;
            }
        }
        let token: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();

        if let Ok(int) = token.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        token
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{}'", token),
            })
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        match &self.src[start..self.pos] {
            "None" => Ok(Value::Null),
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            other => Err(LiteralError {
                offset: start,
                message: format!("unsupported identifier '{}'", other),
            }),
        }
    }
}
