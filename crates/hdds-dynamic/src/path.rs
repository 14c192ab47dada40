// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dotted and bracket-indexed field paths (`a.b[2].c`).

use crate::DynamicDataError;
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Struct member or union case.
    Member(String),
    /// Sequence/array element (0-based).
    Index(usize),
}

/// Parsed field path. The empty path addresses the value itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a path string.
    ///
    /// Members are separated by `.`, indices follow a member (or the start of
    /// the path) in brackets: `samples[0].value`, `[3]`.
    pub fn parse(path: &str) -> Result<Self, DynamicDataError> {
        let mut segments = Vec::new();
        if path.is_empty() {
            return Ok(Self { segments });
        }

        for (pos, part) in path.split('.').enumerate() {
            let (name, mut rest) = match part.find('[') {
                Some(open) => part.split_at(open),
                None => (part, ""),
            };
            if name.is_empty() && (pos > 0 || rest.is_empty()) {
                return Err(DynamicDataError::InvalidPath(path.to_string()));
            }
            if !name.is_empty() {
                segments.push(PathSegment::Member(name.to_string()));
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| DynamicDataError::InvalidPath(path.to_string()))?;
                if !rest.starts_with('[') {
                    return Err(DynamicDataError::InvalidPath(path.to_string()));
                }
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| DynamicDataError::InvalidPath(path.to_string()))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    /// Path segments in order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True for the empty path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a member segment.
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Member(name.into()));
        self
    }

    /// Append an index segment.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }
}

impl FromStr for FieldPath {
    type Err = DynamicDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Member(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Member(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> PathSegment {
        PathSegment::Member(name.to_string())
    }

    #[test]
    fn test_parse_dotted() {
        let path = FieldPath::parse("a.b.c").expect("valid");
        assert_eq!(path.segments(), &[member("a"), member("b"), member("c")]);
    }

    #[test]
    fn test_parse_indexed() {
        let path = FieldPath::parse("samples[2].value").expect("valid");
        assert_eq!(
            path.segments(),
            &[member("samples"), PathSegment::Index(2), member("value")]
        );

        let path = FieldPath::parse("grid[1][0]").expect("valid");
        assert_eq!(
            path.segments(),
            &[member("grid"), PathSegment::Index(1), PathSegment::Index(0)]
        );

        let path = FieldPath::parse("[3]").expect("valid");
        assert_eq!(path.segments(), &[PathSegment::Index(3)]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(FieldPath::parse("").expect("valid").is_empty());
    }

    #[test]
    fn test_parse_malformed() {
        for bad in ["a..b", ".a", "a.", "a[", "a[x]", "a[1", "a[1]b", "a.[1]"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(DynamicDataError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["a", "a.b[2].c", "grid[1][0]", "[0].x"] {
            let path: FieldPath = text.parse().expect("valid");
            assert_eq!(path.to_string(), text);
        }
        let built = FieldPath::default().member("a").index(4).member("b");
        assert_eq!(built.to_string(), "a[4].b");
    }
}
