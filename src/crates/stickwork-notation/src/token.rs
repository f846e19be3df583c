//! Typed voice and sticking tokens
//!
//! Voice text such as `"K+S"`, `"(S)"` or `"-"` and sticking text such as
//! `"R"`, `"lR"` or `"(L)"` is read once here. Everything downstream works with
//! [`NoteToken`] and [`Sticking`] values instead of strings.

use serde::{Deserialize, Serialize};
use std::fmt;

use stickwork_core::{Limb, VoiceId};

use crate::error::{ParseError, Result};
use crate::lexer::{Lexer, Token};
use crate::span::Span;

/// What sounds on one grid cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NoteToken {
    /// Voices struck together, in canonical order. Empty for a rest.
    pub voices: Vec<VoiceId>,
    pub is_ghost: bool,
    pub has_ornament_prefix: bool,
}

impl NoteToken {
    pub fn rest() -> Self {
        NoteToken::default()
    }

    pub fn single(voice: VoiceId) -> Self {
        NoteToken {
            voices: vec![voice],
            ..NoteToken::default()
        }
    }

    /// Several voices on one cell; order and duplicates in the input don't matter
    pub fn combined(voices: impl IntoIterator<Item = VoiceId>) -> Self {
        let mut voices: Vec<VoiceId> = voices.into_iter().collect();
        voices.sort();
        voices.dedup();
        NoteToken {
            voices,
            ..NoteToken::default()
        }
    }

    pub fn ghosted(mut self) -> Self {
        self.is_ghost = !self.voices.is_empty();
        self
    }

    pub fn is_rest(&self) -> bool {
        self.voices.is_empty()
    }

    /// Parse voice text such as `"S"`, `"K+S"`, `"(S)"` or `"-"`.
    pub fn parse(source: &str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let token = parse_voice_token(&mut lexer)?;
        expect_end(&mut lexer)?;
        Ok(token)
    }

    /// Like [`NoteToken::parse`], but unreadable text becomes a rest.
    pub fn parse_lenient(source: &str) -> Self {
        match NoteToken::parse(source) {
            Ok(token) => token,
            Err(e) => {
                log::warn!("treating voice token '{}' as a rest: {}", source, e);
                NoteToken::rest()
            }
        }
    }

    /// Fold a sticking into this note: a ghosted sticking ghosts the note and
    /// an ornament prefix marks it.
    pub fn with_sticking(mut self, sticking: &Sticking) -> Self {
        if self.is_rest() {
            return self;
        }
        self.is_ghost |= sticking.is_ghost;
        self.has_ornament_prefix |= sticking.ornament.is_some();
        self
    }
}

impl fmt::Display for NoteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_rest() {
            return f.write_str("-");
        }
        let joined = self
            .voices
            .iter()
            .map(|v| v.symbol())
            .collect::<Vec<_>>()
            .join("+");
        if self.is_ghost {
            write!(f, "({})", joined)
        } else {
            f.write_str(&joined)
        }
    }
}

/// Which limb plays a note, plus grace-note and ghost markings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sticking {
    /// `None` for a rest
    pub limb: Option<Limb>,
    /// Lowercase prefix such as the `l` in `"lR"` (a flam from the left)
    pub ornament: Option<char>,
    pub is_ghost: bool,
}

impl Sticking {
    pub fn hand(limb: Limb) -> Self {
        Sticking {
            limb: Some(limb),
            ..Sticking::default()
        }
    }

    pub fn parse(source: &str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let sticking = match lexer.next_token() {
            None => return Err(ParseError::unexpected_eof("sticking")),
            Some((Token::Rest, _)) => Sticking::default(),
            Some((Token::LParen, open)) => {
                let inner = match lexer.next_token() {
                    Some((Token::Word, span)) => read_limb(lexer.slice(span), span)?,
                    Some((token, span)) => {
                        return Err(ParseError::unexpected_token(
                            "sticking",
                            token.to_string(),
                            span,
                        ))
                    }
                    None => return Err(ParseError::unclosed_delimiter('(', open)),
                };
                match lexer.next_token() {
                    Some((Token::RParen, _)) => {}
                    Some((token, span)) => {
                        return Err(ParseError::unexpected_token(")", token.to_string(), span))
                    }
                    None => return Err(ParseError::unclosed_delimiter('(', open)),
                }
                Sticking {
                    is_ghost: true,
                    ..inner
                }
            }
            Some((Token::Word, span)) => read_limb(lexer.slice(span), span)?,
            Some((token, span)) => {
                return Err(ParseError::unexpected_token("sticking", token.to_string(), span))
            }
        };
        expect_end(&mut lexer)?;
        Ok(sticking)
    }

    /// Like [`Sticking::parse`], but unreadable text becomes a rest.
    pub fn parse_lenient(source: &str) -> Self {
        match Sticking::parse(source) {
            Ok(sticking) => sticking,
            Err(e) => {
                log::warn!("ignoring sticking '{}': {}", source, e);
                Sticking::default()
            }
        }
    }

    pub fn is_rest(&self) -> bool {
        self.limb.is_none()
    }
}

impl fmt::Display for Sticking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(limb) = self.limb else {
            return f.write_str("-");
        };
        let mut text = String::new();
        if let Some(ornament) = self.ornament {
            text.push(ornament);
        }
        text.push_str(limb.symbol());
        if self.is_ghost {
            write!(f, "({})", text)
        } else {
            f.write_str(&text)
        }
    }
}

fn parse_voice_token(lexer: &mut Lexer) -> Result<NoteToken> {
    match lexer.next_token() {
        None => Err(ParseError::unexpected_eof("voice")),
        Some((Token::Rest, _)) => Ok(NoteToken::rest()),
        Some((Token::Word, span)) if lexer.slice(span).eq_ignore_ascii_case("rest") => {
            Ok(NoteToken::rest())
        }
        Some((Token::Word, span)) => parse_voice_list(lexer, span),
        Some((Token::LParen, open)) => {
            let inner = match lexer.next_token() {
                Some((Token::Word, span)) => parse_voice_list(lexer, span)?,
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token("voice", token.to_string(), span))
                }
                None => return Err(ParseError::unclosed_delimiter('(', open)),
            };
            match lexer.next_token() {
                Some((Token::RParen, _)) => Ok(inner.ghosted()),
                Some((token, span)) => {
                    Err(ParseError::unexpected_token(")", token.to_string(), span))
                }
                None => Err(ParseError::unclosed_delimiter('(', open)),
            }
        }
        Some((token, span)) => Err(ParseError::unexpected_token("voice", token.to_string(), span)),
    }
}

/// `word ('+' word)*`, with the first word already consumed
fn parse_voice_list(lexer: &mut Lexer, first: Span) -> Result<NoteToken> {
    let mut voices = vec![read_voice(lexer.slice(first), first)?];
    while let Some((Token::Plus, _)) = lexer.peek_token() {
        lexer.next_token();
        match lexer.next_token() {
            Some((Token::Word, span)) => voices.push(read_voice(lexer.slice(span), span)?),
            Some((token, span)) => {
                return Err(ParseError::unexpected_token("voice", token.to_string(), span))
            }
            None => return Err(ParseError::unexpected_eof("voice after '+'")),
        }
    }
    Ok(NoteToken::combined(voices))
}

fn read_voice(symbol: &str, span: Span) -> Result<VoiceId> {
    VoiceId::from_symbol(symbol).ok_or_else(|| ParseError::unknown_voice(symbol, span))
}

fn read_limb(word: &str, span: Span) -> Result<Sticking> {
    if let Some(limb) = Limb::from_symbol(word) {
        return Ok(Sticking::hand(limb));
    }

    // Ornament prefix: one lowercase letter in front of an uppercase limb
    let mut chars = word.chars();
    if let (Some(prefix), Some(next)) = (chars.next(), chars.next()) {
        if prefix.is_ascii_lowercase() && next.is_ascii_uppercase() {
            if let Some(limb) = Limb::from_symbol(&word[1..]) {
                return Ok(Sticking {
                    limb: Some(limb),
                    ornament: Some(prefix),
                    is_ghost: false,
                });
            }
        }
    }

    Err(ParseError::unknown_limb(word, span))
}

fn expect_end(lexer: &mut Lexer) -> Result<()> {
    match lexer.next_token() {
        None => Ok(()),
        Some((token, span)) => Err(ParseError::unexpected_token(
            "end of token",
            token.to_string(),
            span,
        )),
    }
}
