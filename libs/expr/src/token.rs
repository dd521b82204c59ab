//! Token types for the expression lexer

/// Token types for the expression lexer
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Identifiers
    Identifier,

    // Keywords
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    For,
    Lambda,
    True,
    False,
    None,
    Na,

    // Operators
    Plus,               // +
    Minus,              // -
    Star,               // *
    DoubleStar,         // **
    Slash,              // /
    DoubleSlash,        // //
    Percent,            // %
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    Equal,              // ==
    NotEqual,           // !=
    Dot,                // .

    // Delimiters
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }
    Comma,        // ,
    Colon,        // :

    // End of input
    Eof,

    // Error
    Error, // For syntax errors
}

/// A token in the expression source
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: String, position: usize) -> Self {
        Self {
            token_type,
            value,
            position,
        }
    }

    pub fn eof(position: usize) -> Self {
        Self {
            token_type: TokenType::Eof,
            value: String::new(),
            position,
        }
    }

    pub fn error(message: String, position: usize) -> Self {
        Self {
            token_type: TokenType::Error,
            value: message,
            position,
        }
    }
}
