//! yEnc control-line grammar
//!
//! Recognizes the three control lines emitted by yEnc producers:
//!
//! ```text
//! =ybegin [part=I] [total=N] line=L size=S name=NAME
//! =ypart begin=B end=E
//! =yend size=S [part=I] [pcrc32=PP] [crc32=FF]
//! ```
//!
//! Keywords may carry a version suffix (`=ybegin2`, `=ypart.v1`) which is
//! ignored. Numeric values are unsigned decimals with no leading `+`; the
//! CRC fields are exactly eight lowercase hex digits; `name` runs to the
//! end of the line and may contain spaces and `=`.

use std::collections::HashMap;

/// Control-line keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `=ybegin`
    Begin,
    /// `=ypart`
    Part,
    /// `=yend`
    End,
}

/// What the caller expects [`detect`] to find
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expected {
    /// Only a begin header is acceptable
    Begin,
    /// Only a part header is acceptable
    Part,
    /// Only a trailer is acceptable
    End,
    /// Any control line is acceptable
    #[default]
    Any,
}

/// Parsed `=ybegin` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginLine {
    /// Columns per encoded line
    pub line: u32,
    /// Total file size in bytes (the whole file, even on a part header)
    pub size: u64,
    /// Advertised filename
    pub name: String,
    /// 1-based part index, for multi-part streams
    pub part: Option<u32>,
    /// Declared part count, for multi-part streams
    pub total: Option<u32>,
}

/// Parsed `=ypart` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartLine {
    /// 1-based inclusive offset of the part's first byte in the whole file
    pub begin: u64,
    /// 1-based inclusive offset of the part's last byte in the whole file
    pub end: u64,
}

/// Parsed `=yend` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndLine {
    /// Decoded size of this part in bytes
    pub size: u64,
    /// 1-based part index, when the sender repeats it
    pub part: Option<u32>,
    /// CRC32 of the whole file (single-part) or of the assembled file (last part)
    pub crc32: Option<u32>,
    /// CRC32 of this part's decoded bytes
    pub pcrc32: Option<u32>,
}

/// A successfully parsed control line
#[derive(Debug, Clone, PartialEq)]
pub enum ControlLine {
    /// `=ybegin`
    Begin(BeginLine),
    /// `=ypart`
    Part(PartLine),
    /// `=yend`
    End(EndLine),
}

impl ControlLine {
    /// Keyword this line was parsed from
    pub fn keyword(&self) -> Keyword {
        match self {
            ControlLine::Begin(_) => Keyword::Begin,
            ControlLine::Part(_) => Keyword::Part,
            ControlLine::End(_) => Keyword::End,
        }
    }
}

/// Classify a line by its control keyword without parsing the fields
///
/// Lets the decoder tell a malformed control line apart from a data line
/// that merely starts with `=y`. Returns `None` for anything that is not a
/// recognizable `=ybegin`/`=ypart`/`=yend` line (uuencoded `begin 644 …`
/// included).
pub fn keyword(line: &str) -> Option<Keyword> {
    let rest = line.strip_prefix("=y")?;
    if rest.starts_with("begin") {
        Some(Keyword::Begin)
    } else if rest.starts_with("part") {
        Some(Keyword::Part)
    } else if rest.starts_with("end") {
        Some(Keyword::End)
    } else {
        None
    }
}

/// Detect and parse a yEnc control line
///
/// With `strict` set, the detected keyword must match `expected` or the
/// result is `None`; with `strict` unset any control line is parsed. Lines
/// that do not start with `=y`, unknown keywords, and malformed or missing
/// required fields all yield `None`.
pub fn detect(line: &str, expected: Expected, strict: bool) -> Option<ControlLine> {
    let found = keyword(line)?;
    if strict {
        let wanted = match expected {
            Expected::Begin => Some(Keyword::Begin),
            Expected::Part => Some(Keyword::Part),
            Expected::End => Some(Keyword::End),
            Expected::Any => None,
        };
        if wanted.is_some_and(|w| w != found) {
            return None;
        }
    }

    // fields start after the (possibly version-suffixed) keyword token
    let fields = match line.find(' ') {
        Some(at) => &line[at + 1..],
        None => "",
    };

    match found {
        Keyword::Begin => parse_begin(fields).map(ControlLine::Begin),
        Keyword::Part => parse_part(fields).map(ControlLine::Part),
        Keyword::End => parse_end(fields).map(ControlLine::End),
    }
}

fn parse_begin(fields: &str) -> Option<BeginLine> {
    let params = parse_params(fields)?;
    let line = parse_u32(params.get("line")?)?;
    let size = parse_u64(params.get("size")?)?;
    let name = (*params.get("name")?).to_string();
    if name.is_empty() {
        return None;
    }
    let part = match params.get("part") {
        Some(value) => Some(parse_index(value)?),
        None => None,
    };
    let total = match params.get("total") {
        Some(value) => Some(parse_index(value)?),
        None => None,
    };
    Some(BeginLine {
        line,
        size,
        name,
        part,
        total,
    })
}

fn parse_part(fields: &str) -> Option<PartLine> {
    let params = parse_params(fields)?;
    let begin = parse_u64(params.get("begin")?)?;
    let end = parse_u64(params.get("end")?)?;
    // offsets are 1-based and the range must be forward
    if begin == 0 || begin > end {
        return None;
    }
    Some(PartLine { begin, end })
}

fn parse_end(fields: &str) -> Option<EndLine> {
    let params = parse_params(fields)?;
    let size = parse_u64(params.get("size")?)?;
    let part = match params.get("part") {
        Some(value) => Some(parse_index(value)?),
        None => None,
    };
    let crc32 = match params.get("crc32") {
        Some(value) => Some(parse_crc(value)?),
        None => None,
    };
    let pcrc32 = match params.get("pcrc32") {
        Some(value) => Some(parse_crc(value)?),
        None => None,
    };
    Some(EndLine {
        size,
        part,
        crc32,
        pcrc32,
    })
}

/// Scan the space-separated `name=value` list
///
/// `name` is special: its value is the remainder of the line, trailing
/// whitespace trimmed. A token without `=` makes the whole line malformed.
fn parse_params(fields: &str) -> Option<HashMap<&str, &str>> {
    let mut params = HashMap::new();
    let mut input = fields;
    loop {
        input = input.trim_start_matches(' ');
        if input.is_empty() {
            break;
        }
        let eq = input.find('=')?;
        let key = &input[..eq];
        if key.is_empty() || key.contains(' ') {
            return None;
        }
        let rest = &input[eq + 1..];
        if key == "name" {
            params.insert(key, rest.trim_end());
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.insert(key, &rest[..end]);
        input = &rest[end..];
    }
    Some(params)
}

fn parse_u64(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    parse_u64(value)?.try_into().ok()
}

/// Part indices are 1-based; a declared zero is malformed
fn parse_index(value: &str) -> Option<u32> {
    match parse_u32(value)? {
        0 => None,
        index => Some(index),
    }
}

fn parse_crc(value: &str) -> Option<u32> {
    if value.len() != 8 || !value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return None;
    }
    u32::from_str_radix(value, 16).ok()
}
