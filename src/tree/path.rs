//! Addresses for locations inside a configuration tree.
//! A path is a list of object keys and array indices. Its string form is the
//! key used in sealed bundles, so it must parse back to exactly the same
//! segments: simple keys are written bare, every other key is written as a
//! bracketed JSON string and indices as `[n]`.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathParseError {
    #[error("empty key at offset {0}; empty keys must be written as [\"\"]")]
    EmptyKey(usize),
    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unterminated bracket starting at offset {0}")]
    Unterminated(usize),
    #[error("invalid index at offset {offset}: {reason}")]
    InvalidIndex { offset: usize, reason: String },
    #[error("invalid quoted key at offset {offset}: {reason}")]
    InvalidQuotedKey { offset: usize, reason: String },
}

/// One step into a tree: a key of an object or an index of an array.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Every prefix of this path, from the root (empty) to the path itself.
    pub fn prefixes(&self) -> impl Iterator<Item = &[Segment]> + '_ {
        (0..=self.0.len()).map(move |end| &self.0[..end])
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_bare_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '$')
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_bare_char)
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) if is_bare_key(key) => {
                    if position > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Key(key) => {
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{quoted}]")?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        PathParser { input: text, offset: 0 }.parse()
    }
}

struct PathParser<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> PathParser<'a> {
    fn parse(mut self) -> Result<Path, PathParseError> {
        let mut segments = Vec::new();
        while let Some(ch) = self.peek() {
            let first = segments.is_empty();
            let segment = match ch {
                '[' => self.parse_bracket()?,
                '.' if !first => {
                    self.offset += 1;
                    self.parse_bare()?
                }
                c if first && is_bare_char(c) => self.parse_bare()?,
                found => {
                    return Err(PathParseError::Unexpected {
                        found,
                        offset: self.offset,
                    })
                }
            };
            segments.push(segment);
        }
        Ok(Path(segments))
    }

    fn parse_bare(&mut self) -> Result<Segment, PathParseError> {
        let start = self.offset;
        while let Some(ch) = self.peek() {
            if !is_bare_char(ch) {
                break;
            }
            self.offset += ch.len_utf8();
        }
        if self.offset == start {
            return Err(PathParseError::EmptyKey(start));
        }
        Ok(Segment::Key(self.input[start..self.offset].to_string()))
    }

    fn parse_bracket(&mut self) -> Result<Segment, PathParseError> {
        let start = self.offset;
        self.offset += 1;
        let segment = match self.peek() {
            Some('"') => self.parse_quoted_key(start)?,
            Some(_) => self.parse_index()?,
            None => return Err(PathParseError::Unterminated(start)),
        };
        match self.peek() {
            Some(']') => {
                self.offset += 1;
                Ok(segment)
            }
            Some(found) => Err(PathParseError::Unexpected {
                found,
                offset: self.offset,
            }),
            None => Err(PathParseError::Unterminated(start)),
        }
    }

    fn parse_quoted_key(&mut self, bracket: usize) -> Result<Segment, PathParseError> {
        let start = self.offset;
        self.offset += 1;
        let mut escaped = false;
        loop {
            let ch = self.peek().ok_or(PathParseError::Unterminated(bracket))?;
            self.offset += ch.len_utf8();
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => break,
                _ => escaped = false,
            }
        }
        let literal = &self.input[start..self.offset];
        let key: String =
            serde_json::from_str(literal).map_err(|e| PathParseError::InvalidQuotedKey {
                offset: start,
                reason: format!("{e}"),
            })?;
        Ok(Segment::Key(key))
    }

    fn parse_index(&mut self) -> Result<Segment, PathParseError> {
        let start = self.offset;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.offset += 1;
        }
        let digits = &self.input[start..self.offset];
        if digits.is_empty() {
            return Err(PathParseError::InvalidIndex {
                offset: start,
                reason: "expected digits or a quoted key".to_string(),
            });
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(PathParseError::InvalidIndex {
                offset: start,
                reason: "leading zero".to_string(),
            });
        }
        digits
            .parse::<usize>()
            .map(Segment::Index)
            .map_err(|e| PathParseError::InvalidIndex {
                offset: start,
                reason: format!("{e}"),
            })
    }

    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathVisitor;

        impl<'de> Visitor<'de> for PathVisitor {
            type Value = Path;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a tree path such as `a.b[0][\"c.d\"]`")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Path, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PathVisitor)
    }
}
