//! Tokenizer for map function source

use crate::error::{ScriptError, ScriptResult};

/// Punctuation and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    Dot,
    Question,
    Assign,
    Arrow,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    AndAnd,
    OrOr,
}

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or keyword
    Ident(String),
    /// Numeric literal
    Number(f64),
    /// String literal with escapes resolved
    Str(String),
    /// Operator or delimiter
    Punct(Punct),
    /// End of input
    Eof,
}

/// Token plus the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Tokenize a whole source string
pub fn tokenize(source: &str) -> ScriptResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comments
        if c == '/' && i + 1 < chars.len() {
            match chars[i + 1].1 {
                '/' => {
                    while i < chars.len() && chars[i].1 != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '*' => {
                    i += 2;
                    loop {
                        if i + 1 >= chars.len() {
                            return Err(ScriptError::syntax(pos, "unterminated comment"));
                        }
                        if chars[i].1 == '*' && chars[i + 1].1 == '/' {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                    continue;
                }
                _ => {}
            }
        }

        let fraction_start =
            c == '.' && i + 1 < chars.len() && chars[i + 1].1.is_ascii_digit();
        if c.is_ascii_digit() || fraction_start {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i].1 == 'e' || chars[i].1 == 'E') {
                i += 1;
                if i < chars.len() && (chars[i].1 == '+' || chars[i].1 == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().map(|(_, ch)| ch).collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ScriptError::syntax(pos, format!("invalid number '{}'", text)))?;
            tokens.push(Spanned {
                token: Token::Number(value),
                pos,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len()
                && (chars[i].1.is_alphanumeric() || chars[i].1 == '_' || chars[i].1 == '$')
            {
                i += 1;
            }
            let ident: String = chars[start..i].iter().map(|(_, ch)| ch).collect();
            tokens.push(Spanned {
                token: Token::Ident(ident),
                pos,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let (value, next) = read_string(&chars, i)?;
            tokens.push(Spanned {
                token: Token::Str(value),
                pos,
            });
            i = next;
            continue;
        }

        let rest = |n: usize| -> Option<char> { chars.get(i + n).map(|(_, ch)| *ch) };
        let (punct, width) = match (c, rest(1), rest(2)) {
            ('=', Some('='), Some('=')) => (Punct::EqEqEq, 3),
            ('!', Some('='), Some('=')) => (Punct::NotEqEq, 3),
            ('=', Some('='), _) => (Punct::EqEq, 2),
            ('=', Some('>'), _) => (Punct::Arrow, 2),
            ('!', Some('='), _) => (Punct::NotEq, 2),
            ('<', Some('='), _) => (Punct::Le, 2),
            ('>', Some('='), _) => (Punct::Ge, 2),
            ('&', Some('&'), _) => (Punct::AndAnd, 2),
            ('|', Some('|'), _) => (Punct::OrOr, 2),
            ('(', _, _) => (Punct::LParen, 1),
            (')', _, _) => (Punct::RParen, 1),
            ('{', _, _) => (Punct::LBrace, 1),
            ('}', _, _) => (Punct::RBrace, 1),
            ('[', _, _) => (Punct::LBracket, 1),
            (']', _, _) => (Punct::RBracket, 1),
            (',', _, _) => (Punct::Comma, 1),
            (';', _, _) => (Punct::Semi, 1),
            (':', _, _) => (Punct::Colon, 1),
            ('.', _, _) => (Punct::Dot, 1),
            ('?', _, _) => (Punct::Question, 1),
            ('=', _, _) => (Punct::Assign, 1),
            ('<', _, _) => (Punct::Lt, 1),
            ('>', _, _) => (Punct::Gt, 1),
            ('+', _, _) => (Punct::Plus, 1),
            ('-', _, _) => (Punct::Minus, 1),
            ('*', _, _) => (Punct::Star, 1),
            ('/', _, _) => (Punct::Slash, 1),
            ('%', _, _) => (Punct::Percent, 1),
            ('!', _, _) => (Punct::Not, 1),
            _ => return Err(ScriptError::syntax(pos, format!("unexpected character '{}'", c))),
        };
        tokens.push(Spanned {
            token: Token::Punct(punct),
            pos,
        });
        i += width;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: source.len(),
    });
    Ok(tokens)
}

fn read_string(chars: &[(usize, char)], start: usize) -> ScriptResult<(String, usize)> {
    let (pos, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((out, i + 1));
        }
        if c == '\n' {
            break;
        }
        if c == '\\' {
            i += 1;
            let esc = chars
                .get(i)
                .map(|(_, ch)| *ch)
                .ok_or_else(|| ScriptError::syntax(pos, "unterminated string"))?;
            match esc {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'b' => out.push('\u{0008}'),
                'f' => out.push('\u{000C}'),
                '0' => out.push('\0'),
                'u' => {
                    let hex: String = chars
                        .iter()
                        .skip(i + 1)
                        .take(4)
                        .map(|(_, ch)| *ch)
                        .collect();
                    let code = u32::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.len() == 4)
                        .ok_or_else(|| ScriptError::syntax(chars[i].0, "invalid \\u escape"))?;
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                    i += 4;
                }
                other => out.push(other),
            }
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }

    Err(ScriptError::syntax(pos, "unterminated string"))
}
