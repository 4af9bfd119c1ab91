//! Operator-level view of a page's content.
//!
//! Marked-content rewriting works on whole operators: a `BT`..`ET` block
//! or a single `Do` gets wrapped in `BDC`/`EMC` and the list is written
//! back with [`serialize`](crate::serialize::serialize). Operators the
//! rewriter does not touch must keep their meaning through that round trip,
//! so operands keep their source form (string kind, dictionary key order).

use crate::error::BackendError;

/// One argument to a content-stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    /// Without the leading `/`, e.g. `P` for `/P`.
    Name(String),
    /// `( .. )` string, escapes already resolved.
    LiteralString(Vec<u8>),
    /// `< .. >` string, hex already decoded.
    HexString(Vec<u8>),
    Array(Vec<Operand>),
    Boolean(bool),
    Null,
    /// Inline property list such as `<< /MCID 3 >>` on `BDC`, in source order.
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// Numeric value of an integer or real operand.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Raw bytes of a literal or hex string operand.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(b) | Operand::HexString(b) => Some(b),
            _ => None,
        }
    }

    /// Look up a key in a dictionary operand.
    pub fn dict_get(&self, key: &str) -> Option<&Operand> {
        match self {
            Operand::Dictionary(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// An operator and the operands pushed before it. An inline image is a
/// single `BI` operator carrying its dictionary and then its raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub name: String,
    pub operands: Vec<Operand>,
}

impl Operator {
    pub fn new(name: &str, operands: Vec<Operand>) -> Self {
        Self {
            name: name.to_string(),
            operands,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Numeric value of operand `i`.
    pub fn number(&self, i: usize) -> Option<f64> {
        self.operands.get(i).and_then(Operand::as_f64)
    }

    /// Whether this operator shows text (`Tj`, `TJ`, `'`, `"`).
    pub fn shows_text(&self) -> bool {
        matches!(self.name.as_str(), "Tj" | "TJ" | "'" | "\"")
    }

    /// Tag name of a `BMC`/`BDC` operator.
    pub fn marked_content_tag(&self) -> Option<&str> {
        match self.name.as_str() {
            "BMC" | "BDC" => self.operands.first().and_then(Operand::as_name),
            _ => None,
        }
    }

    /// MCID carried in the property list of a `BDC` operator.
    pub fn mcid(&self) -> Option<u32> {
        if self.name != "BDC" {
            return None;
        }
        match self.operands.get(1)?.dict_get("MCID")? {
            Operand::Integer(i) => u32::try_from(*i).ok(),
            _ => None,
        }
    }

    /// XObject resource name invoked by a `Do` operator.
    pub fn xobject_name(&self) -> Option<&str> {
        if self.name != "Do" {
            return None;
        }
        self.operands.first().and_then(Operand::as_name)
    }
}

/// Split decoded content bytes into operators. Comments are dropped and a
/// `BI`..`ID`..`EI` inline image becomes one `BI` operator.
///
/// # Errors
///
/// [`BackendError::Interpreter`] when the bytes cannot be split, for
/// example an unterminated string or dictionary.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    Lexer::new(input).run()
}

/// Returns `true` if `b` is a PDF whitespace character.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn hex_digit(b: u8) -> Result<u8, BackendError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(BackendError::Interpreter(format!(
            "invalid hex digit: {:?}",
            b as char
        ))),
    }
}

fn interp(msg: &str) -> BackendError {
    BackendError::Interpreter(msg.to_string())
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Vec<Operator>, BackendError> {
        let mut ops = Vec::new();
        let mut stack: Vec<Operand> = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let Some(b) = self.peek() else {
                break;
            };
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'*' | b'\'' | b'"' => {
                    let keyword = self.read_keyword();
                    match keyword.as_str() {
                        "true" => stack.push(Operand::Boolean(true)),
                        "false" => stack.push(Operand::Boolean(false)),
                        "null" => stack.push(Operand::Null),
                        "BI" => {
                            let (dict, data) = self.read_inline_image()?;
                            stack.clear();
                            ops.push(Operator::new(
                                "BI",
                                vec![Operand::Dictionary(dict), Operand::LiteralString(data)],
                            ));
                        }
                        _ => ops.push(Operator {
                            name: keyword,
                            operands: std::mem::take(&mut stack),
                        }),
                    }
                }
                b']' => return Err(interp("unexpected ']' outside array")),
                b'(' | b'<' | b'[' | b'/' | b'0'..=b'9' | b'+' | b'-' | b'.' => {
                    stack.push(self.read_object()?);
                }
                _ => self.pos += 1,
            }
        }

        Ok(ops)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|c| c != b'\n' && c != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Read one operand. Bare keywords other than `true`/`false`/`null`
    /// become names, which only happens inside arrays and dictionaries.
    fn read_object(&mut self) -> Result<Operand, BackendError> {
        let b = self.peek().ok_or_else(|| interp("unexpected end of stream"))?;
        match b {
            b'(' => Ok(Operand::LiteralString(self.read_literal_string()?)),
            b'<' if self.peek_at(1) == Some(b'<') => Ok(Operand::Dictionary(self.read_dictionary()?)),
            b'<' => Ok(Operand::HexString(self.read_hex_string()?)),
            b'[' => Ok(Operand::Array(self.read_array()?)),
            b'/' => Ok(Operand::Name(self.read_name())),
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number(),
            b'a'..=b'z' | b'A'..=b'Z' => {
                let keyword = self.read_keyword();
                Ok(match keyword.as_str() {
                    "true" => Operand::Boolean(true),
                    "false" => Operand::Boolean(false),
                    "null" => Operand::Null,
                    _ => Operand::Name(keyword),
                })
            }
            _ => Err(BackendError::Interpreter(format!(
                "unexpected byte in operand: 0x{b:02X}"
            ))),
        }
    }

    /// Literal string `(...)` with balanced parentheses and escape sequences.
    fn read_literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| interp("unterminated escape in literal string"))?;
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut val = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        val = val * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((val & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }

        Err(interp("unterminated literal string"))
    }

    fn read_hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let b = self.peek().ok_or_else(|| interp("unterminated hex string"))?;
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if !is_whitespace(b) {
                digits.push(hex_digit(b)?);
            }
        }
        if digits.len() % 2 != 0 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
    }

    fn read_array(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(interp("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.read_object()?),
            }
        }
    }

    fn read_dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(interp("unterminated dictionary")),
                Some(b'>') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(entries);
                }
                Some(b'/') => {
                    let key = self.read_name();
                    self.skip_whitespace_and_comments();
                    if self.peek().is_none() {
                        return Err(interp("unterminated dictionary value"));
                    }
                    let value = self.read_object()?;
                    entries.push((key, value));
                }
                Some(_) => return Err(interp("expected name key in dictionary")),
            }
        }
    }

    /// `/Name` token with `#XX` escapes decoded.
    fn read_name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_whitespace(b) && !is_delimiter(b))
        {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Ok(hi), Ok(lo)) = (hex_digit(raw[i + 1]), hex_digit(raw[i + 2])) {
                    name.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            name.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&name).into_owned()
    }

    fn read_number(&mut self) -> Result<Operand, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut has_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'.' if !has_dot => has_dot = true,
                b'0'..=b'9' => {}
                _ => break,
            }
            self.pos += 1;
        }
        let token = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| interp("invalid UTF-8 in number token"))?;
        if has_dot {
            let token = match token {
                "." | "-." | "+." => "0",
                t => t,
            };
            token
                .parse()
                .map(Operand::Real)
                .map_err(|_| BackendError::Interpreter(format!("invalid real number: {token}")))
        } else {
            match token {
                "+" | "-" => Ok(Operand::Integer(0)),
                t => t
                    .parse()
                    .map(Operand::Integer)
                    .map_err(|_| BackendError::Interpreter(format!("invalid integer: {t}"))),
            }
        }
    }

    /// Keyword: a letter or `*'"` followed by letters, digits, `*'"`
    /// (digits cover `d0`/`d1`).
    fn read_keyword(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'*' | b'\'' | b'"'))
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// `BI <entries> ID <data> EI`, called after `BI` was consumed.
    fn read_inline_image(&mut self) -> Result<(Vec<(String, Operand)>, Vec<u8>), BackendError> {
        let mut dict = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                None => return Err(interp("unterminated inline image (missing ID)")),
                Some(b'I')
                    if self.peek_at(1) == Some(b'D')
                        && self.peek_at(2).is_none_or(is_whitespace) =>
                {
                    self.pos += 2;
                    if self.peek().is_some_and(is_whitespace) {
                        self.pos += 1;
                    }
                    break;
                }
                Some(b'/') => {
                    let key = self.read_name();
                    self.skip_whitespace_and_comments();
                    if self.peek().is_none() {
                        return Err(interp("unterminated inline image dictionary"));
                    }
                    let value = self.read_object()?;
                    dict.push((key, value));
                }
                Some(_) => return Err(interp("expected name key in inline image dictionary")),
            }
        }

        let data_start = self.pos;
        while self.pos < self.input.len() {
            let at_boundary = self.pos == data_start || is_whitespace(self.input[self.pos - 1]);
            if at_boundary
                && self.peek() == Some(b'E')
                && self.peek_at(1) == Some(b'I')
                && self
                    .peek_at(2)
                    .is_none_or(|b| is_whitespace(b) || is_delimiter(b))
            {
                let mut end = self.pos;
                if end > data_start && is_whitespace(self.input[end - 1]) {
                    end -= 1;
                }
                let data = self.input[data_start..end].to_vec();
                self.pos += 2;
                return Ok((dict, data));
            }
            self.pos += 1;
        }

        Err(interp("unterminated inline image (missing EI)"))
    }
}
