use std::collections::BTreeSet;

use crate::decor::parse_decorations;
use crate::error::{GraphError, Result};

/// Pretty format handed to `git log`; the subject goes last because it may
/// contain anything, including the separator
pub const LOG_FORMAT: &str = "format:%H%x01%P%x01%d%x01%an%x01%aD%x01%s";

/// Byte separating the fields of one record
pub const FIELD_SEPARATOR: u8 = 0x01;

/// Length of a full hex commit id
pub const ID_LEN: usize = 40;

/// Fields following the id: parents, decorations, author, date, subject
const FIELD_COUNT: usize = 5;

/// Converts raw field bytes to text
pub trait TextDecoder {
    fn decode(&self, raw: &[u8]) -> String;
}

impl<F> TextDecoder for F
where
    F: Fn(&[u8]) -> String,
{
    fn decode(&self, raw: &[u8]) -> String {
        self(raw)
    }
}

/// Lossy UTF-8 decoding, invalid sequences become U+FFFD
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Lossy;

impl TextDecoder for Utf8Lossy {
    fn decode(&self, raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// One line of log output split into its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub id: String,
    pub parents: Vec<String>,
    pub tags: BTreeSet<String>,
    pub author: Option<String>,
    pub authored_date: Option<String>,
    pub subject: Option<String>,
}

/// Extract the commit id from the fixed-width record prefix
pub fn record_id(raw: &[u8]) -> Result<&str> {
    let prefix = raw
        .get(..ID_LEN)
        .ok_or_else(|| GraphError::malformed("record shorter than a commit id", raw))?;
    parse_id(prefix).ok_or_else(|| GraphError::malformed("commit id is not hex", raw))
}

fn parse_id(raw: &[u8]) -> Option<&str> {
    if raw.len() != ID_LEN || !raw.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    std::str::from_utf8(raw).ok()
}

fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

impl LogRecord {
    pub fn parse(raw: &[u8], decoder: &dyn TextDecoder) -> Result<Self> {
        let line = trim_line_ending(raw);
        let id = record_id(line)?.to_string();

        let rest = match line.get(ID_LEN..) {
            Some([sep, rest @ ..]) if *sep == FIELD_SEPARATOR => rest,
            _ => return Err(GraphError::malformed("missing separator after commit id", raw)),
        };

        let fields: Vec<&[u8]> = rest.splitn(FIELD_COUNT, |b| *b == FIELD_SEPARATOR).collect();
        let [parents, decorations, author, authored_date, subject] = fields[..] else {
            return Err(GraphError::malformed(
                format!("expected {} fields after the id, found {}", FIELD_COUNT, fields.len()),
                raw,
            ));
        };

        let parents = parents
            .split(|b| *b == b' ')
            .filter(|p| !p.is_empty())
            .map(|p| {
                parse_id(p)
                    .map(str::to_string)
                    .ok_or_else(|| GraphError::malformed("parent id is not hex", raw))
            })
            .collect::<Result<Vec<_>>>()?;

        let tags = if decorations.is_empty() {
            BTreeSet::new()
        } else {
            parse_decorations(&decoder.decode(decorations))
        };

        let text = |field: &[u8]| (!field.is_empty()).then(|| decoder.decode(field));

        Ok(LogRecord {
            id,
            parents,
            tags,
            author: text(author),
            authored_date: text(authored_date),
            subject: text(subject),
        })
    }
}
