//! Placement scripts: where each texture lives inside the container.
//!
//! ```text
//! # comment
//! Dir  object_link
//! Set  TexS 32x32
//! Exp  RGBA16 8A1C40 eye_open
//! Exp  RGBA16 8A2440 eye_half
//! ```
//!
//! `Dir` and `Set TexS` change the state that every following `Exp` line
//! picks up.  Parsing is a fold over the lines with that state as the
//! accumulator.  The format tag is kept as written; it is resolved per
//! record by [`PlacementRecord::format`], so an unknown tag fails only that
//! record and not the whole script.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::codec::CodecError;
use crate::format::FormatTag;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("line {line}: `{directive}` is missing an argument")]
    MissingArgument { line: usize, directive: &'static str },
    #[error("line {line}: bad texture size `{value}` (expected WxH)")]
    BadSize { line: usize, value: String },
    #[error("line {line}: bad hex address `{value}`")]
    BadAddress { line: usize, value: String },
    #[error("line {line}: `Exp` before any `Set TexS`")]
    NoSize { line: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── PlacementRecord ──────────────────────────────────────────────────────────

/// One texture placement: location, dimensions, format and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub directory: String,
    pub width:     u32,
    pub height:    u32,
    /// Tag as written in the script (`RGBA3`, `ia8`, ...).
    pub format:    String,
    pub address:   u64,
    pub name:      String,
}

impl PlacementRecord {
    pub fn format(&self) -> Result<FormatTag, CodecError> {
        FormatTag::from_name(&self.format)
    }

    /// Raw block length at `address`.
    pub fn byte_len(&self) -> Result<usize, CodecError> {
        self.format()?.byte_len(self.width, self.height)
    }

    /// Path of this record's artifact relative to an output root.
    pub fn relative_path(&self, extension: &str) -> std::path::PathBuf {
        let file = format!("{}.{}", self.name, extension);
        if self.directory.is_empty() {
            file.into()
        } else {
            Path::new(&self.directory).join(file)
        }
    }
}

// ── Parser ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ParseState {
    directory: String,
    size:      Option<(u32, u32)>,
    records:   Vec<PlacementRecord>,
}

impl ParseState {
    fn apply(mut self, line_no: usize, line: &str) -> Result<Self, ScriptError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(self);
        }
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            // A bare `Dir` returns to the output root.
            Some("Dir") => {
                self.directory = tokens.next().unwrap_or_default().to_owned();
            }
            Some("Set") => {
                if tokens.next() == Some("TexS") {
                    let value = arg(tokens.next(), line_no, "Set TexS")?;
                    self.size = Some(parse_size(value).ok_or_else(|| ScriptError::BadSize {
                        line:  line_no,
                        value: value.to_owned(),
                    })?);
                }
            }
            Some("Exp") => {
                let format  = arg(tokens.next(), line_no, "Exp")?;
                let address = arg(tokens.next(), line_no, "Exp")?;
                let name    = arg(tokens.next(), line_no, "Exp")?;
                let (width, height) = self.size.ok_or(ScriptError::NoSize { line: line_no })?;
                let address = parse_hex(address).ok_or_else(|| ScriptError::BadAddress {
                    line:  line_no,
                    value: address.to_owned(),
                })?;
                self.records.push(PlacementRecord {
                    directory: self.directory.clone(),
                    width,
                    height,
                    format: format.to_owned(),
                    address,
                    name: name.to_owned(),
                });
            }
            Some(other) => {
                tracing::debug!("line {}: ignoring directive `{}`", line_no, other);
            }
            None => {}
        }
        Ok(self)
    }
}

fn arg<'a>(token: Option<&'a str>, line: usize, directive: &'static str) -> Result<&'a str, ScriptError> {
    token.ok_or(ScriptError::MissingArgument { line, directive })
}

fn parse_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

fn parse_hex(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

/// Parse script text into records, in encounter order.
pub fn parse_script(text: &str) -> Result<Vec<PlacementRecord>, ScriptError> {
    text.lines()
        .enumerate()
        .try_fold(ParseState::default(), |state, (i, line)| state.apply(i + 1, line))
        .map(|state| state.records)
}

pub fn parse_script_file<P: AsRef<Path>>(path: P) -> Result<Vec<PlacementRecord>, ScriptError> {
    parse_script(&std::fs::read_to_string(path)?)
}

// ── Renderer ─────────────────────────────────────────────────────────────────

/// A record to render, possibly without a known address.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Placed(&'a PlacementRecord),
    /// Written as a commented-out `Exp` line with a placeholder address.
    Missing(&'a PlacementRecord),
}

impl<'a> Entry<'a> {
    fn record(&self) -> &'a PlacementRecord {
        match self {
            Entry::Placed(r) | Entry::Missing(r) => r,
        }
    }
}

/// Render records back into script text.
pub fn render_script(records: &[PlacementRecord]) -> String {
    render_entries(records.iter().map(Entry::Placed))
}

/// Render entries, emitting `Dir` on directory changes and `Set TexS` on
/// size or format changes.
pub fn render_entries<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = Entry<'a>>,
{
    let mut out = String::new();
    let mut directory = "";
    let mut size      = None;
    let mut format    = "";

    for entry in entries {
        let r = entry.record();
        if r.directory != directory {
            directory = &r.directory;
            if directory.is_empty() {
                out.push_str("Dir\n");
            } else {
                let _ = writeln!(out, "Dir {}", directory);
            }
        }
        if size != Some((r.width, r.height)) || r.format != format {
            size   = Some((r.width, r.height));
            format = &r.format;
            let _ = writeln!(out, "Set TexS {}x{}", r.width, r.height);
        }
        match entry {
            Entry::Placed(r)  => { let _ = writeln!(out, "Exp {} {:X} {}", r.format, r.address, r.name); }
            Entry::Missing(r) => {
                let _ = writeln!(out, "# Exp {} XXXX {} (missing - search manually)", r.format, r.name);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_record() {
        let records = parse_script("Dir tex\nSet TexS 16x16\nExp I8 A0 foo").unwrap();
        assert_eq!(records, vec![PlacementRecord {
            directory: "tex".into(),
            width:     16,
            height:    16,
            format:    "I8".into(),
            address:   0xA0,
            name:      "foo".into(),
        }]);
        assert_eq!(records[0].format().unwrap(), FormatTag::I8);
        assert_eq!(records[0].byte_len().unwrap(), 256);
    }

    #[test]
    fn state_carries_across_lines() {
        let text = "\
# header comment

Dir a
Set TexS 8x4
Exp I4 10 one
Exp IA8 0x20 two
Dir b
Exp RGBA3 30 three
Set TexS 2x2
Exp rgba32 40 four
";
        let r = parse_script(text).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!((r[1].directory.as_str(), r[1].width, r[1].address), ("a", 8, 0x20));
        assert_eq!((r[2].directory.as_str(), r[2].height), ("b", 4));
        assert_eq!(r[2].format().unwrap(), FormatTag::Rgba16);
        assert_eq!((r[3].directory.as_str(), r[3].width, r[3].height), ("b", 2, 2));
        assert_eq!(r[3].format().unwrap(), FormatTag::Rgba32);
    }

    #[test]
    fn unknown_format_survives_parsing() {
        let r = parse_script("Set TexS 1x1\nExp XYZ 0 bad").unwrap();
        assert_eq!(r[0].format, "XYZ");
        assert!(matches!(r[0].format(), Err(CodecError::UnknownFormat(_))));
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        assert!(matches!(
            parse_script("Dir x\nExp I8 0 a"),
            Err(ScriptError::NoSize { line: 2 })
        ));
        assert!(matches!(
            parse_script("Set TexS 16by16"),
            Err(ScriptError::BadSize { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("Set TexS 4x4\n\nExp I8 ZZ a"),
            Err(ScriptError::BadAddress { line: 3, .. })
        ));
        assert!(matches!(
            parse_script("Set TexS 4x4\nExp I8 10"),
            Err(ScriptError::MissingArgument { line: 2, directive: "Exp" })
        ));
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let r = parse_script("Foo bar\nSet Other 1\nSet TexS 2x2\nExp I8 0 a").unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn render_then_parse_is_identity() {
        let text = "Dir a\nSet TexS 8x4\nExp I4 10 one\nExp IA8 20 two\nDir b\nExp RGBA3 8A1C40 three\n";
        let records = parse_script(text).unwrap();
        let rendered = render_script(&records);
        assert_eq!(parse_script(&rendered).unwrap(), records);
        assert!(rendered.contains("Exp RGBA3 8A1C40 three"));
        // format change re-emits the size line
        assert_eq!(rendered.matches("Set TexS 8x4").count(), 3);
    }

    #[test]
    fn bare_dir_returns_to_root() {
        let records = vec![
            PlacementRecord {
                directory: "a".into(),
                width:     2,
                height:    2,
                format:    "I8".into(),
                address:   0x10,
                name:      "nested".into(),
            },
            PlacementRecord {
                directory: String::new(),
                width:     2,
                height:    2,
                format:    "I8".into(),
                address:   0x20,
                name:      "top".into(),
            },
        ];
        let rendered = render_script(&records);
        assert!(rendered.contains("\nDir\n"), "{rendered}");
        assert_eq!(parse_script(&rendered).unwrap(), records);
        assert_eq!(records[1].relative_path("png"), std::path::PathBuf::from("top.png"));
    }

    #[test]
    fn missing_entries_are_commented_out() {
        let records = parse_script("Set TexS 4x4\nExp I8 10 a\nExp I8 20 b").unwrap();
        let text = render_entries([Entry::Placed(&records[0]), Entry::Missing(&records[1])]);
        assert!(text.contains("Exp I8 10 a\n"));
        assert!(text.contains("# Exp I8 XXXX b (missing - search manually)"));
        assert_eq!(parse_script(&text).unwrap().len(), 1);
    }
}
