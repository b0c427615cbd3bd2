//! Tokenizer for the SavedVariables literal syntax

use crate::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Local,
    True,
    False,
    Nil,
    Ident(String),
    /// Quoted string (content without quotes, escapes resolved)
    Str(String),
    /// Literal without fraction or exponent that fits in an `i64`
    Integer(i64),
    Number(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eq,
    Comma,
    Semicolon,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Local => write!(f, "keyword `local`"),
            Token::True => write!(f, "`true`"),
            Token::False => write!(f, "`false`"),
            Token::Nil => write!(f, "`nil`"),
            Token::Ident(name) => write!(f, "identifier `{}`", name),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Integer(i) => write!(f, "number {}", i),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Eq => write!(f, "'='"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split `src` into tokens. The result always ends with `Token::Eof`.
pub fn lex(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = if src.starts_with('\u{feff}') { 3 } else { 0 };

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if c == b'-' && bytes.get(pos + 1) == Some(&b'-') {
            pos = skip_comment(src, pos)?;
            continue;
        }

        let start = pos;
        let token = match c {
            b'{' => {
                pos += 1;
                Token::LBrace
            }
            b'}' => {
                pos += 1;
                Token::RBrace
            }
            b'[' => {
                pos += 1;
                Token::LBracket
            }
            b']' => {
                pos += 1;
                Token::RBracket
            }
            b'=' => {
                pos += 1;
                Token::Eq
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b';' => {
                pos += 1;
                Token::Semicolon
            }
            b'"' => {
                let (s, end) = lex_string(src, pos)?;
                pos = end;
                Token::Str(s)
            }
            b'0'..=b'9' | b'-' | b'+' | b'.' => {
                let (token, end) = lex_number(src, pos)?;
                pos = end;
                token
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = scan_while(bytes, pos, is_word_byte);
                let word = &src[pos..end];
                pos = end;
                match word {
                    "local" => Token::Local,
                    "true" => Token::True,
                    "false" => Token::False,
                    "nil" => Token::Nil,
                    _ => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let ch = src[pos..].chars().next().unwrap_or('?');
                return Err(ParseError::new(pos, "a token", format!("character {:?}", ch)));
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: bytes.len(),
    });
    Ok(tokens)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn scan_while(bytes: &[u8], mut pos: usize, pred: impl Fn(u8) -> bool) -> usize {
    while pos < bytes.len() && pred(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Skip a `--` comment starting at `pos`, returning the offset after it
fn skip_comment(src: &str, pos: usize) -> Result<usize, ParseError> {
    let bytes = src.as_bytes();
    let body = pos + 2;

    // Long bracket: --[[ ... ]] or --[==[ ... ]==]
    if bytes.get(body) == Some(&b'[') {
        let level_end = scan_while(bytes, body + 1, |b| b == b'=');
        if bytes.get(level_end) == Some(&b'[') {
            let level = level_end - body - 1;
            let close = format!("]{}]", "=".repeat(level));
            return match src[level_end + 1..].find(&close) {
                Some(i) => Ok(level_end + 1 + i + close.len()),
                None => Err(ParseError::new(
                    pos,
                    format!("closing '{}' of block comment", close),
                    "end of input",
                )),
            };
        }
    }

    Ok(scan_while(bytes, body, |b| b != b'\n'))
}

/// Lex a double-quoted string starting at `pos`; returns the decoded text and
/// the offset after the closing quote
fn lex_string(src: &str, pos: usize) -> Result<(String, usize), ParseError> {
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut i = pos + 1;
    let mut segment = i;

    loop {
        match bytes.get(i) {
            None => {
                return Err(ParseError::new(pos, "closing '\"' of string", "end of input"));
            }
            Some(b'\n') | Some(b'\r') => {
                return Err(ParseError::new(pos, "closing '\"' of string", "line break"));
            }
            Some(b'"') => {
                out.push_str(&src[segment..i]);
                return Ok((out, i + 1));
            }
            Some(b'\\') => {
                out.push_str(&src[segment..i]);
                let resolved = match bytes.get(i + 1) {
                    Some(b'"') => '"',
                    Some(b'\\') => '\\',
                    Some(b'\'') => '\'',
                    Some(b'n') | Some(b'\n') => '\n',
                    Some(b'r') => '\r',
                    Some(b't') => '\t',
                    None => {
                        return Err(ParseError::new(pos, "closing '\"' of string", "end of input"));
                    }
                    Some(_) => {
                        let ch = src[i + 1..].chars().next().unwrap_or('?');
                        return Err(ParseError::new(
                            i,
                            "escape sequence",
                            format!("'\\{}'", ch),
                        ));
                    }
                };
                out.push(resolved);
                i += 2;
                segment = i;
            }
            Some(_) => i += 1,
        }
    }
}

/// Lex a number literal: optional sign, digits, fraction, exponent
fn lex_number(src: &str, pos: usize) -> Result<(Token, usize), ParseError> {
    let bytes = src.as_bytes();
    let mut i = pos;

    if matches!(bytes[i], b'-' | b'+') {
        i += 1;
    }
    let int_end = scan_while(bytes, i, |b| b.is_ascii_digit());
    let mut digits = int_end - i;
    i = int_end;
    let integral = digits > 0;

    if bytes.get(i) == Some(&b'.') {
        let frac_end = scan_while(bytes, i + 1, |b| b.is_ascii_digit());
        digits += frac_end - i - 1;
        i = frac_end;
    }

    let mut well_formed = digits > 0;

    if well_formed && matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-') | Some(b'+')) {
            j += 1;
        }
        let exp_end = scan_while(bytes, j, |b| b.is_ascii_digit());
        well_formed = exp_end > j;
        i = exp_end.max(j);
    }

    // Glued trailing characters such as `1.2.3` or `0x1F` make the literal malformed
    let end = scan_while(bytes, i, |b| is_word_byte(b) || b == b'.');
    let text = &src[pos..end];
    let malformed = || ParseError::new(pos, "number", format!("malformed number `{}`", text));

    if !well_formed || end != i {
        return Err(malformed());
    }
    if integral && end == int_end {
        if let Ok(n) = text.parse::<i64>() {
            return Ok((Token::Integer(n), end));
        }
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok((Token::Number(n), end)),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        lex(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_lex_assignment() {
        assert_eq!(
            tokens("local DB = { [1] = true, }"),
            vec![
                Token::Local,
                Token::Ident("DB".to_string()),
                Token::Eq,
                Token::LBrace,
                Token::LBracket,
                Token::Integer(1),
                Token::RBracket,
                Token::Eq,
                Token::True,
                Token::Comma,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_offsets() {
        let spans = lex("x  = \"a\"").unwrap();
        let offsets: Vec<usize> = spans.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 3, 5, 8]);
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            tokens("42 -7 320.5 .5 +3 1e3 2.5E-2"),
            vec![
                Token::Integer(42),
                Token::Integer(-7),
                Token::Number(320.5),
                Token::Number(0.5),
                Token::Integer(3),
                Token::Number(1000.0),
                Token::Number(0.025),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_malformed_numbers() {
        for src in ["1.2.3", "1e", "0x1F", "-", "12abc", "1e999"] {
            let err = lex(src).unwrap_err();
            assert_eq!(err.offset, 0, "{}", src);
            assert_eq!(err.expected, "number", "{}", src);
        }
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(
            tokens(r#""a\"b\\c\nd""#),
            vec![Token::Str("a\"b\\c\nd".to_string()), Token::Eof]
        );
        assert_eq!(
            tokens("\"Zul'Gurub · ünïcode\""),
            vec![Token::Str("Zul'Gurub · ünïcode".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_lex_unterminated_string() {
        let err = lex("{ \"abc").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.found, "end of input");

        let err = lex("\"abc\n\"").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.found, "line break");
    }

    #[test]
    fn test_lex_unknown_escape() {
        let err = lex(r#""a\qb""#).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.expected, "escape sequence");
    }

    #[test]
    fn test_lex_skips_comments() {
        let src = "{ -- [1]\n 1, --[[ block\n comment ]] 2 --[==[ x ]] ]==] }";
        assert_eq!(
            tokens(src),
            vec![
                Token::LBrace,
                Token::Integer(1),
                Token::Comma,
                Token::Integer(2),
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_block_comment() {
        let err = lex("{ --[[ never closed").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_lex_skips_bom() {
        assert_eq!(tokens("\u{feff}nil"), vec![Token::Nil, Token::Eof]);
    }

    #[test]
    fn test_lex_unknown_character() {
        let err = lex("{ @ }").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.found, "character '@'");
    }

    #[test]
    fn test_lex_large_integers_stay_exact() {
        assert_eq!(
            tokens("9007199254740993 -9223372036854775808 99999999999999999999 1.0"),
            vec![
                Token::Integer(9_007_199_254_740_993),
                Token::Integer(i64::MIN),
                Token::Number(1e20),
                Token::Number(1.0),
                Token::Eof,
            ]
        );
    }
}
