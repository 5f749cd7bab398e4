//! JSON text parser producing a [`Node`] tree
use core::fmt;

use crate::node::Node;

/// Maximum nesting of arrays and objects.
pub const RECURSION_LIMIT: usize = 128;

/// Parse result
pub type Result<T> = core::result::Result<T, ParseError>;

/// Parse error
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum ParseError {
    /// EOF while parsing
    UnexpectedEof,
    /// Invalid JSON string escape sequence
    InvalidEscapeSequence,
    /// A control ASCII character detected in a JSON string
    StringControlChar,
    /// Expected this character to be a `':'`.
    ExpectedColon,
    /// Expected this character to be either a `','` or a `']'`.
    ExpectedArrayCommaOrEnd,
    /// Array content starts with a leading `','`.
    LeadingArrayComma,
    /// Array content ends with a trailing `','`.
    TrailingArrayComma,
    /// Expected this character to be either a `','` or a `'}'`.
    ExpectedObjectCommaOrEnd,
    /// Object content starts with a leading `,`.
    LeadingObjectComma,
    /// Object content ends with a trailing `,`.
    TrailingObjectComma,
    /// Expected to parse either `true`, `false`, or `null`.
    ExpectedToken,
    /// Invalid number
    InvalidNumber,
    /// Invalid unicode code point
    InvalidUnicodeCodePoint,
    /// Object key is not a string
    KeyMustBeAString,
    /// JSON has non-whitespace trailing characters after the value
    TrailingCharacters,
    /// Unexpected character
    UnexpectedChar,
    /// Arrays and objects are nested too deep
    RecursionLimitExceeded,
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParseError::UnexpectedEof => "Unexpected end of JSON input",
            ParseError::InvalidEscapeSequence => "Invalid JSON string escape sequence",
            ParseError::StringControlChar => "A control ASCII character found in a JSON string",
            ParseError::ExpectedArrayCommaOrEnd => "Expected `','` or `']'`",
            ParseError::LeadingArrayComma => "JSON array content starts with a leading `','`",
            ParseError::TrailingArrayComma => "JSON array content ends with a trailing `','`",
            ParseError::ExpectedObjectCommaOrEnd => "Expected `','` or `'}'`",
            ParseError::LeadingObjectComma => "JSON object content starts with a leading `','`",
            ParseError::TrailingObjectComma => "JSON object content ends with a trailing `','`",
            ParseError::ExpectedColon => "Expected `':'`",
            ParseError::ExpectedToken => "Expected either `true`, `false`, or `null`.",
            ParseError::InvalidNumber => "Invalid number",
            ParseError::InvalidUnicodeCodePoint => "Invalid unicode code point",
            ParseError::KeyMustBeAString => "Object key is not a string",
            ParseError::TrailingCharacters => {
                "JSON has non-whitespace trailing character after the value"
            }
            ParseError::UnexpectedChar => "Unexpected token while parsing a JSON value",
            ParseError::RecursionLimitExceeded => "JSON arrays and objects are nested too deep",
        })
    }
}

/// Parse a complete JSON document.
///
/// Only whitespace may follow the top-level value.
pub fn parse(text: &str) -> Result<Node> {
    let mut parser = Parser::new(text);
    let node = parser.parse_value()?;
    parser.end()?;
    Ok(node)
}

/* special JSON characters */
const SP: u8 = b' ';
const QU: u8 = b'"';
const RS: u8 = b'\\';
const SO: u8 = b'/';
/* special JSON string escape characters */
const B_: u8 = 0x08; const BB: u8 = b'b'; // \b -> \x08
const T_: u8 = 0x09; const TT: u8 = b't'; // \t -> \x09
const N_: u8 = 0x0A; // \n -> \x0A
const F_: u8 = 0x0C; // \f => \x0C
const R_: u8 = 0x0D; // \r => \x0D
/* \uUUUU */
const UU: u8 = b'u';
const __: u8 = 0;
/* only selected (un)escape codes are permitted */
static UNESCAPE: [u8;19] = [
/* \b,  c,  d,  e, \f,  g,  h,  i,  j,  k,  l,  m, \n,  o,  p,  q, \r,  s, \t */
    B_, __, __, __, F_, __, __, __, __, __, __, __, N_, __, __, __, R_, __, T_
];

#[inline(always)]
fn parse_hex_nib(ch: u8) -> Option<u8> {
    match ch {
        n@b'0'..=b'9' => Some(n - b'0'),
        _ => match ch|0x20 {
            n@b'a'..=b'f' => Some(n - b'a' + 10),
            _ => None
        }
    }
}

#[inline]
fn parse_uuuu(code: &[u8]) -> Option<u32> {
    code.iter().try_fold(0u32, |acc, &ch|
        parse_hex_nib(ch).map(|n| (acc << 4) | u32::from(n)))
}

/// Return the length of a JSON number at the start of `input`.
fn number_len(input: &[u8]) -> Option<usize> {
    let digits = |from: usize| input[from..].iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(input.len() - from);
    let mut index = usize::from(input.first() == Some(&b'-'));
    match input.get(index) {
        Some(b'0') => index += 1,
        Some(b'1'..=b'9') => index += digits(index),
        _ => return None
    }
    if input.get(index) == Some(&b'.') {
        index += 1;
        match digits(index) {
            0 => return None,
            n => index += n
        }
    }
    if matches!(input.get(index), Some(b'e'|b'E')) {
        index += 1;
        if matches!(input.get(index), Some(b'+'|b'-')) {
            index += 1;
        }
        match digits(index) {
            0 => return None,
            n => index += n
        }
    }
    Some(index)
}

/// A cursor over JSON text.
pub struct Parser<'a> {
    input: &'a [u8],
    index: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input: input.as_bytes(), index: 0, depth: 0 }
    }

    /// Consume the parser and check if trailing characters only consist of whitespace
    pub fn end(mut self) -> Result<()> {
        match self.eat_whitespace() {
            Err(ParseError::UnexpectedEof) => Ok(()),
            _ => Err(ParseError::TrailingCharacters)
        }
    }

    /// Current byte offset into the input.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Advance the input cursor by `len` characters.
    fn eat_some(&mut self, len: usize) {
        self.index += len;
    }

    /// Advance cursor while discarding any JSON whitespace characters
    /// and peek at the next non-whitespace character.
    fn eat_whitespace(&mut self) -> Result<u8> {
        let index = self.index;
        self.input[index..].iter()
        .position(|&b| !matches!(b, SP|T_|N_|R_))
        .map(|pos| {
            self.index = index + pos;
            self.input[index + pos]
        })
        .ok_or(ParseError::UnexpectedEof)
    }

    /// Parse a token and if match is found advance the cursor.
    fn parse_token_content(&mut self, token: &[u8]) -> Result<()> {
        let size = token.len();
        match self.input.get(self.index..self.index + size) {
            Some(slice) if slice == token => {
                self.eat_some(size);
                Ok(())
            }
            Some(..) => Err(ParseError::ExpectedToken),
            None => Err(ParseError::UnexpectedEof)
        }
    }

    /// Parse any JSON value after skipping leading whitespace.
    pub fn parse_value(&mut self) -> Result<Node> {
        match self.eat_whitespace()? {
            b'n' => self.parse_token_content(b"null").map(|_| Node::Null),
            b't' => self.parse_token_content(b"true").map(|_| Node::Bool(true)),
            b'f' => self.parse_token_content(b"false").map(|_| Node::Bool(false)),
            b'"' => {
                self.eat_some(1);
                self.parse_str_content().map(Node::String)
            }
            b'0'..=b'9'|b'-' => self.parse_number(),
            b'[' => self.nested(Self::parse_array),
            b'{' => self.nested(Self::parse_object),
            _ => Err(ParseError::UnexpectedChar),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        if self.depth == RECURSION_LIMIT {
            return Err(ParseError::RecursionLimitExceeded)
        }
        self.depth += 1;
        self.eat_some(1);
        let res = parse(self);
        self.depth -= 1;
        res
    }

    fn parse_number(&mut self) -> Result<Node> {
        let input = &self.input[self.index..];
        let len = number_len(input).ok_or(ParseError::InvalidNumber)?;
        // the matched range holds only ASCII digits and `-+.eE`
        let text = core::str::from_utf8(&input[..len])
            .map_err(|_| ParseError::InvalidNumber)?;
        let node = Node::Number(text.to_owned());
        self.eat_some(len);
        Ok(node)
    }

    /// Call after consuming an opening `'['`.
    fn parse_array(&mut self) -> Result<Node> {
        let mut elements = Vec::new();
        let mut first = true;
        loop {
            match self.eat_whitespace()? {
                b']' => {
                    self.eat_some(1);
                    break Ok(Node::Array(elements))
                }
                b',' => if first {
                    return Err(ParseError::LeadingArrayComma)
                }
                else {
                    self.eat_some(1);
                    if b']' == self.eat_whitespace()? {
                        return Err(ParseError::TrailingArrayComma);
                    }
                }
                _ => if first {
                    first = false;
                }
                else {
                    return Err(ParseError::ExpectedArrayCommaOrEnd);
                }
            }
            elements.push(self.parse_value()?);
        }
    }

    /// Call after consuming an opening `'{'`.
    fn parse_object(&mut self) -> Result<Node> {
        let mut object = Node::Object(Vec::new());
        let mut first = true;
        loop {
            let peek = match self.eat_whitespace()? {
                b'}' => {
                    self.eat_some(1);
                    break Ok(object)
                }
                b',' => if first {
                    return Err(ParseError::LeadingObjectComma)
                }
                else {
                    self.eat_some(1);
                    match self.eat_whitespace()? {
                        b'}' => return Err(ParseError::TrailingObjectComma),
                        ch => ch
                    }
                }
                ch => if first {
                    first = false;
                    ch
                }
                else {
                    return Err(ParseError::ExpectedObjectCommaOrEnd);
                }
            };
            if peek != QU {
                return Err(ParseError::KeyMustBeAString)
            }
            self.eat_some(1);
            let key = self.parse_str_content()?;
            self.parse_key_colon()?;
            let value = self.parse_value()?;
            object.insert(key, value);
        }
    }

    /// Eats whitespace and checks if the next character is a colon
    fn parse_key_colon(&mut self) -> Result<()> {
        if b':' == self.eat_whitespace()? {
            self.eat_some(1);
            Ok(())
        } else {
            Err(ParseError::ExpectedColon)
        }
    }

    /// Parse `XXXX` of a `\uXXXX` escape, combining surrogate pairs.
    ///
    /// Call with the cursor at the first hex digit, returns the number of consumed bytes.
    fn parse_unicode_escape(&self, index: usize) -> Result<(char, usize)> {
        let hex = |at: usize| self.input.get(at..at + 4)
            .ok_or(ParseError::UnexpectedEof)
            .and_then(|code| parse_uuuu(code).ok_or(ParseError::InvalidEscapeSequence));
        let code = hex(index)?;
        match code {
            0xD800..=0xDBFF => {
                if self.input.get(index + 4..index + 6) != Some(&[RS, UU][..]) {
                    return Err(ParseError::InvalidUnicodeCodePoint)
                }
                let low = hex(index + 6)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(ParseError::InvalidUnicodeCodePoint)
                }
                let code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                char::from_u32(code)
                    .map(|ch| (ch, 10))
                    .ok_or(ParseError::InvalidUnicodeCodePoint)
            }
            _ => char::from_u32(code)
                .map(|ch| (ch, 4))
                .ok_or(ParseError::InvalidUnicodeCodePoint)
        }
    }

    /// Parse a string until a closing `'"'` is found, return the unescaped content.
    ///
    /// Call after consuming an opening `'"'`.
    pub fn parse_str_content(&mut self) -> Result<String> {
        let mut out = Vec::new();
        let mut start = self.index;
        loop {
            let found = self.input.get(start..).and_then(|slice|
                /* search for either '\', '"' or a control character */
                slice.iter().position(|&b| matches!(b, RS|QU) || b <= 0x1F))
                .ok_or(ParseError::UnexpectedEof)?;
            let end = start + found;
            out.extend_from_slice(&self.input[start..end]);
            match self.input[end] {
                QU => { /* '"' found */
                    self.index = end + 1;
                    break String::from_utf8(out)
                        .map_err(|_| ParseError::InvalidUnicodeCodePoint)
                }
                RS => { /* '\' found */
                    let index = end + 1;
                    match self.input.get(index).copied() {
                        Some(c@(QU|RS|SO)) => { /* preserve escaped */
                            out.push(c);
                            start = index + 1;
                        }
                        Some(c@(BB..=TT)) => { /* control codes */
                            let unescaped = UNESCAPE[(c-BB) as usize];
                            if unescaped == 0 {
                                break Err(ParseError::InvalidEscapeSequence)
                            }
                            out.push(unescaped);
                            start = index + 1;
                        }
                        Some(UU) => { /* u0000 */
                            let (ch, len) = self.parse_unicode_escape(index + 1)?;
                            let mut buf = [0u8; 4];
                            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                            start = index + 1 + len;
                        }
                        Some(..) => break Err(ParseError::InvalidEscapeSequence),
                        None => break Err(ParseError::UnexpectedEof)
                    }
                }
                _ => {
                    break Err(ParseError::StringControlChar)
                }
            }
        }
    }
}
