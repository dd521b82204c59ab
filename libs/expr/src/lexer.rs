//! Expression lexer - tokenizes input strings
//!
//! Converts expression strings into a stream of tokens. Positions are
//! character offsets into the source, used for caret diagnostics.

use crate::token::{Token, TokenType};

/// The expression lexer
pub struct Lexer {
    position: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            chars,
            current_char,
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.chars[start..self.position].iter().collect()
    }

    /// Read a number literal; returns the text and whether it is a float
    fn read_number(&mut self) -> (String, bool) {
        let start = self.position;
        let mut is_float = false;

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && self.peek().is_some_and(|p| p.is_ascii_digit()) && !is_float {
                is_float = true;
                self.advance();
            } else if (c == 'e' || c == 'E')
                && self
                    .peek()
                    .is_some_and(|p| p.is_ascii_digit() || p == '+' || p == '-')
            {
                is_float = true;
                self.advance(); // e
                if self.current_char == Some('+') || self.current_char == Some('-') {
                    self.advance();
                }
            } else {
                break;
            }
        }

        (self.chars[start..self.position].iter().collect(), is_float)
    }

    /// Read a quoted string literal, resolving escape sequences
    fn read_string(&mut self, quote: char, start: usize) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                self.advance(); // closing quote
                return Token::new(TokenType::StringLiteral, value, start);
            }
            if c == '\\' {
                self.advance();
                let Some(escaped) = self.current_char else {
                    return Token::error("incomplete escape sequence".into(), self.position);
                };
                match escaped {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    other => {
                        return Token::error(
                            format!("unknown escape sequence `\\{other}`"),
                            self.position,
                        )
                    }
                }
                self.advance();
            } else {
                value.push(c);
                self.advance();
            }
        }

        Token::error("unterminated string literal".into(), start)
    }

    fn keyword(text: &str) -> Option<TokenType> {
        let token_type = match text {
            "and" => TokenType::And,
            "or" => TokenType::Or,
            "not" => TokenType::Not,
            "in" => TokenType::In,
            "is" => TokenType::Is,
            "if" => TokenType::If,
            "else" => TokenType::Else,
            "for" => TokenType::For,
            "lambda" => TokenType::Lambda,
            "True" => TokenType::True,
            "False" => TokenType::False,
            "None" => TokenType::None,
            "NA" => TokenType::Na,
            _ => return Option::None,
        };
        Some(token_type)
    }

    /// Produce the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let Some(c) = self.current_char else {
            return Token::eof(start);
        };

        if c.is_ascii_digit() {
            let (text, is_float) = self.read_number();
            let token_type = if is_float {
                TokenType::FloatLiteral
            } else {
                TokenType::IntLiteral
            };
            return Token::new(token_type, text, start);
        }

        if c.is_alphabetic() || c == '_' {
            let text = self.read_identifier();
            return match Self::keyword(&text) {
                Some(token_type) => Token::new(token_type, text, start),
                None => Token::new(TokenType::Identifier, text, start),
            };
        }

        if c == '\'' || c == '"' {
            return self.read_string(c, start);
        }

        let two = |lexer: &mut Self, token_type, text: &str| {
            lexer.advance();
            lexer.advance();
            Token::new(token_type, text.into(), start)
        };
        let one = |lexer: &mut Self, token_type, text: &str| {
            lexer.advance();
            Token::new(token_type, text.into(), start)
        };

        match (c, self.peek()) {
            ('*', Some('*')) => two(self, TokenType::DoubleStar, "**"),
            ('/', Some('/')) => two(self, TokenType::DoubleSlash, "//"),
            ('<', Some('=')) => two(self, TokenType::LessThanOrEqual, "<="),
            ('>', Some('=')) => two(self, TokenType::GreaterThanOrEqual, ">="),
            ('=', Some('=')) => two(self, TokenType::Equal, "=="),
            ('!', Some('=')) => two(self, TokenType::NotEqual, "!="),
            ('+', _) => one(self, TokenType::Plus, "+"),
            ('-', _) => one(self, TokenType::Minus, "-"),
            ('*', _) => one(self, TokenType::Star, "*"),
            ('/', _) => one(self, TokenType::Slash, "/"),
            ('%', _) => one(self, TokenType::Percent, "%"),
            ('<', _) => one(self, TokenType::LessThan, "<"),
            ('>', _) => one(self, TokenType::GreaterThan, ">"),
            ('.', _) => one(self, TokenType::Dot, "."),
            ('(', _) => one(self, TokenType::OpenParen, "("),
            (')', _) => one(self, TokenType::CloseParen, ")"),
            ('[', _) => one(self, TokenType::OpenBracket, "["),
            (']', _) => one(self, TokenType::CloseBracket, "]"),
            ('{', _) => one(self, TokenType::OpenBrace, "{"),
            ('}', _) => one(self, TokenType::CloseBrace, "}"),
            (',', _) => one(self, TokenType::Comma, ","),
            (':', _) => one(self, TokenType::Colon, ":"),
            _ => {
                self.advance();
                Token::error(format!("unexpected character `{c}`"), start)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<(TokenType, String)> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.token_type == TokenType::Eof;
            out.push((token.token_type, token.value));
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_a_filter_expression() {
        let toks = tokens("QUAL >= 30 and ANN['IMPACT'] == 'HIGH'");
        let types: Vec<TokenType> = toks.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            types,
            [
                TokenType::Identifier,
                TokenType::GreaterThanOrEqual,
                TokenType::IntLiteral,
                TokenType::And,
                TokenType::Identifier,
                TokenType::OpenBracket,
                TokenType::StringLiteral,
                TokenType::CloseBracket,
                TokenType::Equal,
                TokenType::StringLiteral,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_int_and_float_literals() {
        assert_eq!(tokens("42")[0].0, TokenType::IntLiteral);
        assert_eq!(tokens("0.25")[0].0, TokenType::FloatLiteral);
        assert_eq!(tokens("1e-3")[0].0, TokenType::FloatLiteral);
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(tokens("NA")[0].0, TokenType::Na);
        assert_eq!(tokens("na")[0].0, TokenType::Identifier);
    }

    #[test]
    fn string_escapes() {
        let toks = tokens(r#""a\tb""#);
        assert_eq!(toks[0].1, "a\tb");
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        assert_eq!(tokens("'oops")[0].0, TokenType::Error);
    }
}
