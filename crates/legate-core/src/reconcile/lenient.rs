//! Permissive literal parsing for quasi-structured agent text.
//!
//! Agents frequently return Python-style literals rather than strict JSON:
//! single-quoted strings, `True`/`False`/`None`, trailing commas, tuples.
//! This module accepts that dialect and produces a `serde_json::Value`
//! without ever evaluating the input: it is a plain recursive-descent
//! scanner with no execution capability.

use serde_json::{Map, Number, Value};

/// Parse one literal. Returns `None` unless the whole input is a single
/// well-formed literal.
pub(crate) fn parse(input: &str) -> Option<Value> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos == parser.input.len() {
        Some(value)
    } else {
        None
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.input[self.pos..].starts_with(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '{' => self.dict(),
            '[' => self.sequence(']'),
            // Python tuples become arrays.
            '(' => self.sequence(')'),
            '\'' | '"' => self.string().map(Value::String),
            'T' | 'F' | 'N' | 't' | 'f' | 'n' => self.keyword(),
            _ => self.number(),
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump();
        let mut map = Map::new();
        self.skip_ws();
        if self.eat('}') {
            return Some(Value::Object(map));
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.skip_ws();
            if !self.eat(':') {
                return None;
            }
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            if self.eat(',') {
                self.skip_ws();
                // trailing comma
                if self.eat('}') {
                    return Some(Value::Object(map));
                }
                continue;
            }
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            return None;
        }
    }

    fn sequence(&mut self, close: char) -> Option<Value> {
        self.bump();
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(close) {
            return Some(Value::Array(items));
        }
        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                self.skip_ws();
                if self.eat(close) {
                    return Some(Value::Array(items));
                }
                continue;
            }
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            return None;
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        self.bump();
        let mut out = String::new();
        loop {
            let ch = self.bump()?;
            if ch == '\\' {
                match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    escaped @ ('\\' | '\'' | '"') => out.push(escaped),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            } else if ch == quote {
                return Some(out);
            } else {
                out.push(ch);
            }
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        if self.eat_word("True") || self.eat_word("true") {
            return Some(Value::Bool(true));
        }
        if self.eat_word("False") || self.eat_word("false") {
            return Some(Value::Bool(false));
        }
        if self.eat_word("None") || self.eat_word("null") {
            return Some(Value::Null);
        }
        None
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | 'e' | 'E') {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        if text.is_empty() {
            return None;
        }
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::Number(int.into()));
        }
        let float = text.parse::<f64>().ok()?;
        Number::from_f64(float).map(Value::Number)
    }
}
