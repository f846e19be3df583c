use crate::span::Span;
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[regex(r"[0-9]+", parse_count, priority = 10)]
    Number(u32),

    /// Voice symbols, limb letters and ornament-prefixed stickings
    #[regex(r"[a-zA-Z]+", priority = 5)]
    Word,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    /// Joins voices played together, or groups in a phrase ("3+3+2")
    #[token("+")]
    Plus,
    #[token(",")]
    Comma,

    #[token("-")]
    #[token("_")]
    #[token(".")]
    #[token("~")]
    Rest,

    Error,
}

fn parse_count(lex: &mut logos::Lexer<Token>) -> Option<u32> {
    lex.slice().parse().ok()
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Word => write!(f, "word"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Plus => write!(f, "+"),
            Token::Comma => write!(f, ","),
            Token::Rest => write!(f, "rest"),
            Token::Error => write!(f, "error"),
        }
    }
}

/// Lexer wrapper with position tracking
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<(Token, Span)>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Lexer {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    pub fn next_token(&mut self) -> Option<(Token, Span)> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }

        let token = self.inner.next()?;
        let span = Span::from(self.inner.span());
        Some((token.unwrap_or(Token::Error), span))
    }

    pub fn peek_token(&mut self) -> Option<(Token, Span)> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_token());
        }
        self.peeked.as_ref().and_then(|x| x.clone())
    }

    pub fn source(&self) -> &'source str {
        self.inner.source()
    }

    pub fn slice(&self, span: Span) -> &'source str {
        &self.source()[span.to_range()]
    }
}
