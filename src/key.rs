//! Key codec: the on-disk string form of a hierarchical [`Key`].
//!
//! # Grammar
//!
//! A key is the concatenation of its segments, outermost ancestor first:
//!
//! ```text
//! key       := segment+
//! segment   := "/" kind "," identity [ "`" namespace ]
//! identity  := decimal-id | [ "`" ] escaped-name
//! ```
//!
//! - Numeric ids are printed in decimal; `0` is an incomplete key.
//! - Names and namespaces are caret-escaped: `^` → `^^`, `,` → `^,`,
//!   `/` → `^/`, `` ` `` → ``^` ``. Kinds are written verbatim.
//! - A name whose first (up to five) characters are all decimal digits gets a
//!   leading backtick so it is not read back as a numeric id. That backtick
//!   sits directly after the comma; a namespace backtick always follows a
//!   complete identity.
//!
//! ```
//! use entline::{decode_key, encode_key, Key};
//!
//! let key = Key::id("A", 0).child_name("B", "22");
//! assert_eq!(encode_key(&key), "/A,0/B,`22");
//! assert_eq!(decode_key("/A,0/B,`22").unwrap(), key);
//! ```

use crate::error::KeyError;
use crate::model::{Identity, Key, Segment};

const ESCAPE: char = '^';
const MARKER: char = '`';

/// Encode a key into its single-string form.
pub fn encode_key(key: &Key) -> String {
    let mut out = String::new();
    for seg in key.segments() {
        out.push('/');
        out.push_str(&seg.kind);
        out.push(',');
        match &seg.identity {
            Identity::Id(id) => out.push_str(&id.to_string()),
            Identity::Name(name) => {
                if looks_numeric(name) {
                    out.push(MARKER);
                }
                escape_into(&mut out, name);
            }
        }
        if !seg.namespace.is_empty() {
            out.push(MARKER);
            escape_into(&mut out, &seg.namespace);
        }
    }
    out
}

/// Check that [`encode_key`] output for `key` reads back through [`decode_key`].
///
/// Kinds are written verbatim, so they must be non-empty and free of `^`, `,`
/// and `/`. Names must be non-empty.
///
/// # Errors
/// [`KeyError::EmptyKind`], [`KeyError::ReservedInKind`] or
/// [`KeyError::EmptyIdentity`] for the first offending segment (1-based).
pub fn validate_key(key: &Key) -> Result<(), KeyError> {
    for (i, seg) in key.segments().iter().enumerate() {
        let segment = i + 1;
        if seg.kind.is_empty() {
            return Err(KeyError::EmptyKind { segment });
        }
        if let Some(found) = seg.kind.chars().find(|c| matches!(c, '^' | ',' | '/')) {
            return Err(KeyError::ReservedInKind {
                segment,
                kind: seg.kind.clone(),
                found,
            });
        }
        if let Identity::Name(name) = &seg.identity
            && name.is_empty()
        {
            return Err(KeyError::EmptyIdentity { segment });
        }
    }
    Ok(())
}

/// Caret-escape a name or namespace.
pub fn escape_key_part(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    out
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '^' | ',' | '/' | '`') {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

fn looks_numeric(name: &str) -> bool {
    !name.is_empty() && name.bytes().take(5).all(|b| b.is_ascii_digit())
}

/// Decode a key string produced by [`encode_key`].
///
/// # Errors
/// Returns a [`KeyError`] when the string does not follow the key grammar.
pub fn decode_key(s: &str) -> Result<Key, KeyError> {
    if s.is_empty() {
        return Err(KeyError::Empty);
    }
    if !s.starts_with('/') {
        return Err(KeyError::MissingLeadingSlash(s.to_string()));
    }
    let mut parser = KeyParser::default();
    for c in s.chars() {
        parser.feed(c)?;
    }
    parser.finish()
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    BeforeKind,
    Kind,
    Identity,
    Namespace,
}

#[derive(Default)]
struct KeyParser {
    segments: Vec<Segment>,
    mode: Mode,
    escaped: bool,
    buf: String,
    kind: String,
    identity: String,
    /// Identity so far is digits only and carried no leading marker.
    numeric: bool,
}

impl KeyParser {
    fn feed(&mut self, c: char) -> Result<(), KeyError> {
        if self.escaped {
            self.escaped = false;
        } else {
            match c {
                ESCAPE => {
                    self.escaped = true;
                    return Ok(());
                }
                '/' => {
                    match self.mode {
                        Mode::BeforeKind => {}
                        Mode::Kind => return Err(self.missing_comma()),
                        Mode::Identity | Mode::Namespace => self.close_segment()?,
                    }
                    self.mode = Mode::Kind;
                    self.numeric = true;
                    return Ok(());
                }
                ',' if self.mode == Mode::Kind => {
                    self.kind = std::mem::take(&mut self.buf);
                    self.mode = Mode::Identity;
                    return Ok(());
                }
                MARKER if self.mode == Mode::Identity => {
                    if self.buf.is_empty() {
                        self.numeric = false;
                    } else {
                        self.identity = std::mem::take(&mut self.buf);
                        self.mode = Mode::Namespace;
                    }
                    return Ok(());
                }
                _ => {}
            }
        }
        self.buf.push(c);
        if self.mode == Mode::Identity && !c.is_ascii_digit() {
            self.numeric = false;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Key, KeyError> {
        if self.escaped {
            return Err(KeyError::DanglingEscape);
        }
        match self.mode {
            Mode::BeforeKind => return Err(KeyError::Empty),
            Mode::Kind => return Err(self.missing_comma()),
            Mode::Identity | Mode::Namespace => self.close_segment()?,
        }
        Key::from_segments(self.segments).ok_or(KeyError::Empty)
    }

    fn close_segment(&mut self) -> Result<(), KeyError> {
        let segment = self.segments.len() + 1;
        let (value, namespace) = if self.mode == Mode::Namespace {
            (
                std::mem::take(&mut self.identity),
                std::mem::take(&mut self.buf),
            )
        } else {
            (std::mem::take(&mut self.buf), String::new())
        };
        let kind = std::mem::take(&mut self.kind);
        if kind.is_empty() {
            return Err(KeyError::EmptyKind { segment });
        }
        if value.is_empty() {
            return Err(KeyError::EmptyIdentity { segment });
        }
        let identity = if self.numeric {
            let id = value
                .parse::<u64>()
                .map_err(|_| KeyError::IdOutOfRange { segment, value })?;
            Identity::Id(id)
        } else {
            Identity::Name(value)
        };
        self.segments.push(Segment {
            kind,
            identity,
            namespace,
        });
        Ok(())
    }

    fn missing_comma(&self) -> KeyError {
        KeyError::MissingComma {
            segment: self.segments.len() + 1,
        }
    }
}
