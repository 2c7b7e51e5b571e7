//! Single-pass scanner: source bytes -> token vector.
//!
//! Offsets, lines and columns are all byte-based (see spec: "Byte offsets
//! in spans index the raw UTF-8 bytes; column counting is by byte").

use crate::error::{self, LapisResult};
use crate::source_map::{SourceMap, Span};
use crate::token::{Literal, Number, TemplatePart, Token, TokenKind, KEYWORDS};

/// Byte length of the UTF-8 sequence starting with `first`, per the leading
/// byte's high bits. Source text is guaranteed valid UTF-8 (it came from a
/// `&str`), so this never needs to handle malformed input.
fn utf8_width(first: u8) -> usize {
    if first & 0x80 == 0 {
        1
    } else if first & 0xE0 == 0xC0 {
        2
    } else if first & 0xF0 == 0xE0 {
        3
    } else if first & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

pub struct Lexer<'a> {
    source: &'a [u8],
    file_id: u32,
    tokens: Vec<Token>,
    current: usize,
    start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source_map: &mut SourceMap, path: &str, content: &'a str) -> Self {
        let file_id = source_map.add_file(path, content.to_string());
        Self { source: content.as_bytes(), file_id, tokens: Vec::new(), current: 0, start: 0 }
    }

    pub fn tokenize(mut self) -> LapisResult<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        let eof_span = Span::new(self.file_id, self.current, self.current);
        self.tokens.push(Token::new(TokenKind::Eof, "", None, eof_span));
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> u8 {
        *self.source.get(self.current).unwrap_or(&0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self.source.get(self.current + offset).unwrap_or(&0)
    }

    fn advance(&mut self) -> u8 {
        let b = self.peek();
        self.current += 1;
        b
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.current += 1;
        true
    }

    /// Decodes and consumes one whole UTF-8 `char` starting at `current`,
    /// which may span multiple bytes. Used inside string/template bodies
    /// where literal non-ASCII text is copied into the decoded value.
    fn advance_char(&mut self) -> char {
        let start = self.current;
        let width = utf8_width(self.source[start]);
        self.current = (start + width).min(self.source.len());
        std::str::from_utf8(&self.source[start..self.current])
            .expect("source is valid utf-8")
            .chars()
            .next()
            .expect("non-empty utf-8 slice yields a char")
    }

    fn span(&self) -> Span {
        Span::new(self.file_id, self.start, self.current)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        // Our grammar only ever slices on token boundaries the scanner
        // itself produced, which always land on UTF-8 char boundaries.
        std::str::from_utf8(&self.source[start..end]).expect("token slice must be valid utf-8")
    }

    fn push(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.slice(self.start, self.current).to_string();
        let span = self.span();
        self.tokens.push(Token::new(kind, lexeme, literal, span));
    }

    fn scan_token(&mut self) -> LapisResult<()> {
        let c = self.advance();
        match c {
            b'(' => self.push(TokenKind::LeftParen, None),
            b')' => self.push(TokenKind::RightParen, None),
            b'{' => self.push(TokenKind::LeftBrace, None),
            b'}' => self.push(TokenKind::RightBrace, None),
            b'[' => self.push(TokenKind::LeftBracket, None),
            b']' => self.push(TokenKind::RightBracket, None),
            b',' => self.push(TokenKind::Comma, None),
            b'.' => self.push(TokenKind::Dot, None),
            b';' => self.push(TokenKind::Semicolon, None),
            b':' => self.push(TokenKind::Colon, None),
            b'%' => self.push(TokenKind::Percent, None),

            b'+' => {
                if self.matches(b'+') {
                    self.push(TokenKind::PlusPlus, None);
                } else {
                    self.push(TokenKind::Plus, None);
                }
            }
            b'-' => {
                if self.matches(b'-') {
                    self.push(TokenKind::MinusMinus, None);
                } else {
                    self.push(TokenKind::Minus, None);
                }
            }
            b'*' => {
                if self.matches(b'*') {
                    self.push(TokenKind::Power, None);
                } else {
                    self.push(TokenKind::Star, None);
                }
            }
            b'/' => {
                if self.matches(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.matches(b'*') {
                    self.block_comment()?;
                } else {
                    self.push(TokenKind::Slash, None);
                }
            }
            b'=' => {
                if self.matches(b'=') {
                    self.push(TokenKind::Equal, None);
                } else {
                    self.push(TokenKind::Assign, None);
                }
            }
            b'!' => {
                if self.matches(b'=') {
                    self.push(TokenKind::NotEqual, None);
                } else {
                    self.push(TokenKind::Bang, None);
                }
            }
            b'<' => {
                if self.matches(b'=') {
                    self.push(TokenKind::LessEqual, None);
                } else {
                    self.push(TokenKind::Less, None);
                }
            }
            b'>' => {
                if self.matches(b'=') {
                    self.push(TokenKind::GreaterEqual, None);
                } else {
                    self.push(TokenKind::Greater, None);
                }
            }
            b'&' => {
                if self.matches(b'&') {
                    self.push(TokenKind::And, None);
                } else {
                    return Err(error::unexpected_character(self.span(), '&'));
                }
            }
            b'|' => {
                if self.matches(b'|') {
                    self.push(TokenKind::Or, None);
                } else {
                    return Err(error::unexpected_character(self.span(), '|'));
                }
            }

            b' ' | b'\r' => {}
            b'\t' => self.push(TokenKind::Tab, None),
            b'\n' => self.push(TokenKind::Newline, None),

            b'"' => self.string(b'"')?,
            b'\'' => self.string(b'\'')?,
            b'`' => self.template_literal()?,

            b'0'..=b'9' => self.number(),

            b'_' => self.identifier(),
            c if c.is_ascii_alphabetic() => self.identifier(),

            other => {
                return Err(error::unexpected_character(self.span(), other as char));
            }
        }
        Ok(())
    }

    fn block_comment(&mut self) -> LapisResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            if self.is_at_end() {
                return Err(error::unterminated_comment(self.span()));
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == b'*' && self.peek_at(1) == b'/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }
        Ok(())
    }

    fn string(&mut self, quote: u8) -> LapisResult<()> {
        let mut result = String::new();
        while self.peek() != quote && !self.is_at_end() {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(error::unterminated_string(self.span()));
                }
                match self.peek() {
                    b'n' => {
                        self.advance();
                        result.push('\n');
                    }
                    b't' => {
                        self.advance();
                        result.push('\t');
                    }
                    b'\\' => {
                        self.advance();
                        result.push('\\');
                    }
                    b'"' => {
                        self.advance();
                        result.push('"');
                    }
                    b'\'' => {
                        self.advance();
                        result.push('\'');
                    }
                    _ => {
                        result.push('\\');
                        result.push(self.advance_char());
                    }
                }
            } else {
                result.push(self.advance_char());
            }
        }

        if self.is_at_end() {
            return Err(error::unterminated_string(self.span()));
        }
        self.advance(); // closing quote

        self.push(TokenKind::String, Some(Literal::Str(result)));
        Ok(())
    }

    /// Template literal: alternating TEXT and EXPR parts. `{ ... }` regions
    /// (tracking nested braces) are captured verbatim as source text and
    /// re-lexed/re-parsed at evaluation time (see spec Design Notes).
    fn template_literal(&mut self) -> LapisResult<()> {
        let mut parts = Vec::new();
        let mut text = String::new();

        while self.peek() != b'`' && !self.is_at_end() {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_at_end() {
                    return Err(error::unterminated_template(self.span()));
                }
                match self.peek() {
                    b'n' => {
                        self.advance();
                        text.push('\n');
                    }
                    b't' => {
                        self.advance();
                        text.push('\t');
                    }
                    b'\\' => {
                        self.advance();
                        text.push('\\');
                    }
                    b'`' => {
                        self.advance();
                        text.push('`');
                    }
                    b'{' => {
                        self.advance();
                        text.push('{');
                    }
                    b'}' => {
                        self.advance();
                        text.push('}');
                    }
                    _ => {
                        text.push('\\');
                        text.push(self.advance_char());
                    }
                }
            } else if self.peek() == b'{' {
                self.advance();
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }

                let expr_start = self.current;
                let mut depth = 1usize;
                while depth > 0 {
                    if self.is_at_end() {
                        return Err(error::unterminated_template(self.span()));
                    }
                    match self.peek() {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        self.advance();
                    }
                }
                let expr_text = self.slice(expr_start, self.current).trim().to_string();
                self.advance(); // closing '}'
                parts.push(TemplatePart::Expr(expr_text));
            } else {
                text.push(self.advance_char());
            }
        }

        if self.is_at_end() {
            return Err(error::unterminated_template(self.span()));
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        self.advance(); // closing backtick

        self.push(TokenKind::TemplateLiteral, Some(Literal::Template(parts)));
        Ok(())
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.slice(self.start, self.current);
        let value: f64 = text.parse().expect("numeric literal must parse as f64");
        let literal = if value.fract() == 0.0 && value.is_finite() {
            Literal::Number(Number::Int(value as i64))
        } else {
            Literal::Number(Number::Float(value))
        };
        self.push(TokenKind::Number, Some(literal));
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }
        let text = self.slice(self.start, self.current);
        match KEYWORDS.get(text) {
            Some(TokenKind::Boolean) => {
                self.push(TokenKind::Boolean, Some(Literal::Bool(text == "true")));
            }
            Some(kind) => self.push(*kind, None),
            None => {
                let text = text.to_string();
                self.push(TokenKind::Identifier, Some(Literal::Str(text)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        let mut map = SourceMap::new();
        Lexer::new(&mut map, "<test>", src).tokenize().expect("lex should succeed")
    }

    #[test]
    fn spans_cover_every_lexeme() {
        let mut map = SourceMap::new();
        let src = "var x = 42;";
        let tokens = Lexer::new(&mut map, "<test>", src).tokenize().unwrap();
        for token in &tokens {
            if token.kind == TokenKind::Eof {
                continue;
            }
            assert_eq!(map.get_span_text(token.span).unwrap(), token.lexeme);
        }
    }

    #[test]
    fn two_character_operators() {
        let tokens = lex("== != <= >= ++ -- ** && ||");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Power,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_block_comments() {
        let tokens = lex("/* outer /* inner */ still outer */ 1");
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }

    #[test]
    fn unterminated_nested_comment_errors() {
        let mut map = SourceMap::new();
        let err = Lexer::new(&mut map, "<test>", "/* outer /* inner */").tokenize().unwrap_err();
        assert_eq!(err.diagnostic.code, "LAP1002");
    }

    #[test]
    fn string_escapes_and_unknown_escape_preserved() {
        let tokens = lex(r#""a\nb\q""#);
        match &tokens[0].literal {
            Some(Literal::Str(s)) => assert_eq!(s, "a\nb\\q"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn whole_valued_number_is_integer() {
        let tokens = lex("3.0 3.5");
        assert_eq!(tokens[0].literal, Some(Literal::Number(Number::Int(3))));
        assert_eq!(tokens[1].literal, Some(Literal::Number(Number::Float(3.5))));
    }

    #[test]
    fn template_literal_splits_text_and_expr_parts() {
        let tokens = lex("`n is {n + 1}!`");
        match &tokens[0].literal {
            Some(Literal::Template(parts)) => {
                assert_eq!(
                    parts,
                    &vec![
                        TemplatePart::Text("n is ".to_string()),
                        TemplatePart::Expr("n + 1".to_string()),
                        TemplatePart::Text("!".to_string()),
                    ]
                );
            }
            other => panic!("expected template literal, got {other:?}"),
        }
    }

    #[test]
    fn newline_and_tab_are_emitted_as_tokens() {
        let tokens = lex("\n\t");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Newline, TokenKind::Tab, TokenKind::Eof]);
    }

    #[test]
    fn unknown_escape_of_a_multi_byte_character_is_preserved_whole() {
        let tokens = lex("\"\\\u{e9}\"");
        match &tokens[0].literal {
            Some(Literal::Str(s)) => assert_eq!(s, "\\\u{e9}"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn multi_byte_utf8_characters_decode_as_one_char_in_strings() {
        let tokens = lex("\"h\u{e9}llo\"");
        match &tokens[0].literal {
            Some(Literal::Str(s)) => {
                assert_eq!(s, "h\u{e9}llo");
                assert_eq!(s.chars().count(), 5);
            }
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn multi_byte_utf8_characters_decode_as_one_char_in_templates() {
        let tokens = lex("`h\u{e9}llo`");
        match &tokens[0].literal {
            Some(Literal::Template(parts)) => {
                assert_eq!(parts, &vec![TemplatePart::Text("h\u{e9}llo".to_string())]);
            }
            other => panic!("expected template literal, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_character_reports_lex_error() {
        let mut map = SourceMap::new();
        let err = Lexer::new(&mut map, "<test>", "@").tokenize().unwrap_err();
        assert_eq!(err.diagnostic.code, "LAP1001");
    }
}
