//! Article subject parsing for yEnc postings
//!
//! Usenet binary posters advertise yEnc content through a semi-standard
//! subject form centered on the literal ` yEnc ` marker:
//!
//! ```text
//! description [1/2] - "filename" yEnc (3/4) 13450
//! ```
//!
//! Every surrounding token is optional and quoting varies poster to
//! poster, so recognition uses a single tolerant pattern. Downstream code
//! uses the parsed fields to group parts before assembly.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

/// Fields recognized in a yEnc article subject
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleSubject {
    /// Free-form description preceding the filename
    pub description: Option<String>,
    /// Advertised filename
    pub filename: Option<String>,
    /// NZB-style index from a `[i/n]` pair (distinct from the yEnc pair)
    pub nzb_index: Option<u32>,
    /// NZB-style count from a `[i/n]` pair
    pub nzb_count: Option<u32>,
    /// yEnc part index from the `(i/n)` pair after the marker
    pub y_index: Option<u32>,
    /// yEnc part count from the `(i/n)` pair after the marker
    pub y_count: Option<u32>,
    /// Declared size trailing the `(i/n)` pair
    pub size: Option<u64>,
}

static SUBJECT_RE: OnceLock<Regex> = OnceLock::new();

fn subject_re() -> &'static Regex {
    SUBJECT_RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            ^\s*
            (?:
                (?: "(?P<qdesc>[^"]+)" | (?P<desc>\S.*?) )
                \s+
                (?: \[ (?P<index>\d+) / (?P<count>\d+) \] \s+ )?
                -\s+
            )?
            (?: "(?P<qname>[^"]+)" | (?P<name>\S.*?) )
            \s+ (?i:yEnc) \s+
            \( (?P<yindex>\d+)? / (?P<ycount>\d+) \)
            (?: \s+ (?P<size>\d+) )?
            \s*$
            "#,
        )
        .expect("subject pattern is valid")
    })
}

/// Parse a yEnc article subject
///
/// Returns `None` when the subject carries no recognizable yEnc marker.
/// The unquoted-filename form captures the full token run up to the
/// marker, so names with spaces survive either way.
pub fn parse_subject(subject: &str) -> Option<ArticleSubject> {
    let caps = subject_re().captures(subject)?;

    let text = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    let description = text("qdesc").or_else(|| text("desc"));
    let filename = text("qname").or_else(|| text("name"));

    let nzb_index = match caps.name("index") {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let nzb_count = match caps.name("count") {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let y_index = match caps.name("yindex") {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let y_count = Some(caps.name("ycount")?.as_str().parse().ok()?);
    let size = match caps.name("size") {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };

    Some(ArticleSubject {
        description,
        filename,
        nzb_index,
        nzb_count,
        y_index,
        y_count,
        size,
    })
}

/// Render an [`ArticleSubject`] back into the canonical subject form
///
/// The filename is always quoted and the yEnc pair is always present (a
/// subject without a declared count formats as `(1/1)`), so the output
/// parses back to the same fields.
pub fn format_subject(subject: &ArticleSubject) -> String {
    let mut out = String::new();
    if let Some(description) = &subject.description {
        out.push_str(description);
        out.push(' ');
        if let (Some(index), Some(count)) = (subject.nzb_index, subject.nzb_count) {
            let _ = write!(out, "[{}/{}] ", index, count);
        }
        out.push_str("- ");
    }
    if let Some(filename) = &subject.filename {
        let _ = write!(out, "\"{}\" ", filename);
    }
    out.push_str("yEnc (");
    if let Some(y_index) = subject.y_index {
        let _ = write!(out, "{}", y_index);
    }
    let _ = write!(out, "/{})", subject.y_count.unwrap_or(1));
    if let Some(size) = subject.size {
        let _ = write!(out, " {}", size);
    }
    out
}
