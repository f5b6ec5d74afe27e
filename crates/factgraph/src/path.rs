//! Fact paths: parsing, normalization, relative resolution, and wildcard
//! population.
//!
//! A path is absolute (`/a/b`) or relative (`../sibling`). Segments are named
//! children, parent hops, the wildcard `*`, or a collection member `#id`. A
//! path containing wildcards is *abstract*: a template over collection
//! members that resolves to zero or more concrete paths.

use std::fmt;
use std::str::FromStr;

use crate::error::FactGraphError;

// ──────────────────────────────────────────────
// Segments
// ──────────────────────────────────────────────

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A named child fact.
    Named(String),
    /// `..` -- the enclosing fact.
    Parent,
    /// `*` -- every member of the enclosing collection.
    Wildcard,
    /// `#id` -- one member of the enclosing collection.
    Member(String),
}

impl Segment {
    fn parse(raw: &str) -> Result<Segment, FactGraphError> {
        match raw {
            ".." => Ok(Segment::Parent),
            "*" => Ok(Segment::Wildcard),
            _ if raw.starts_with('#') => {
                let id = &raw[1..];
                if id.is_empty() {
                    return Err(FactGraphError::parse("empty member id '#'"));
                }
                Ok(Segment::Member(id.to_string()))
            }
            _ => {
                if raw.is_empty() {
                    return Err(FactGraphError::parse("empty path segment"));
                }
                if raw.contains(['/', '#', '*']) {
                    return Err(FactGraphError::parse(format!("bad segment '{}'", raw)));
                }
                Ok(Segment::Named(raw.to_string()))
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Named(n) => f.write_str(n),
            Segment::Parent => f.write_str(".."),
            Segment::Wildcard => f.write_str("*"),
            Segment::Member(id) => write!(f, "#{}", id),
        }
    }
}

// ──────────────────────────────────────────────
// Path
// ──────────────────────────────────────────────

/// An absolute or relative fact path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    absolute: bool,
    segments: Vec<Segment>,
}

impl Path {
    /// The absolute root `/`.
    pub fn root() -> Path {
        Path {
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Parse and normalize. `.` segments fold away, `..` folds against the
    /// preceding segment, and escaping above the root is rejected.
    pub fn parse(raw: &str) -> Result<Path, FactGraphError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FactGraphError::parse("empty path"));
        }
        let (absolute, rest) = match raw.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let mut segments = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('/') {
                if part == "." {
                    continue;
                }
                segments.push(Segment::parse(part)?);
            }
        }
        Path { absolute, segments }.normalized(raw)
    }

    fn normalized(self, raw: &str) -> Result<Path, FactGraphError> {
        let mut out: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for seg in self.segments {
            match seg {
                Segment::Parent => match out.last() {
                    Some(Segment::Parent) | None => {
                        if self.absolute {
                            return Err(FactGraphError::parse(format!(
                                "path '{}' escapes above root",
                                raw
                            )));
                        }
                        out.push(Segment::Parent);
                    }
                    Some(_) => {
                        out.pop();
                    }
                },
                other => out.push(other),
            }
        }
        Ok(Path {
            absolute: self.absolute,
            segments: out,
        })
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True when any segment is a wildcard.
    pub fn is_abstract(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Wildcard)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Resolve this (relative) path against an absolute base. An absolute
    /// path resolves to itself.
    pub fn resolve(&self, base: &Path) -> Result<Path, FactGraphError> {
        if self.absolute {
            return Ok(self.clone());
        }
        if !base.absolute {
            return Err(FactGraphError::parse(format!(
                "cannot resolve '{}' against relative base '{}'",
                self, base
            )));
        }
        let mut segments = base.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Path {
            absolute: true,
            segments,
        }
        .normalized(&self.to_string())
    }

    /// Map each member segment to a wildcard, yielding the template this
    /// concrete path was instantiated from.
    pub fn to_abstract(&self) -> Path {
        Path {
            absolute: self.absolute,
            segments: self
                .segments
                .iter()
                .map(|s| match s {
                    Segment::Member(_) => Segment::Wildcard,
                    other => other.clone(),
                })
                .collect(),
        }
    }

    /// The enclosing path; `None` at the root or on an empty relative path.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Path {
            absolute: self.absolute,
            segments,
        })
    }

    /// Append one segment.
    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path {
            absolute: self.absolute,
            segments,
        }
    }

    /// Number of wildcard segments.
    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| **s == Segment::Wildcard)
            .count()
    }

    /// Substitute member lists for wildcards, producing the Cartesian
    /// enumeration of concrete paths. `members_by_position[i]` is the member
    /// list of the collection enclosing the i-th wildcard, in path order.
    pub fn populate(&self, members_by_position: &[Vec<String>]) -> Result<Vec<Path>, FactGraphError> {
        if members_by_position.len() != self.wildcard_count() {
            return Err(FactGraphError::parse(format!(
                "path '{}' has {} wildcards, got {} member lists",
                self,
                self.wildcard_count(),
                members_by_position.len()
            )));
        }
        let mut out: Vec<Vec<Segment>> = vec![Vec::with_capacity(self.segments.len())];
        let mut position = 0;
        for seg in &self.segments {
            match seg {
                Segment::Wildcard => {
                    let members = &members_by_position[position];
                    position += 1;
                    let mut next = Vec::with_capacity(out.len() * members.len());
                    for prefix in &out {
                        for id in members {
                            let mut p = prefix.clone();
                            p.push(Segment::Member(id.clone()));
                            next.push(p);
                        }
                    }
                    out = next;
                }
                other => {
                    for prefix in &mut out {
                        prefix.push(other.clone());
                    }
                }
            }
        }
        Ok(out
            .into_iter()
            .map(|segments| Path {
                absolute: self.absolute,
                segments,
            })
            .collect())
    }

    /// True when `prefix` is this path or an ancestor of it.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.absolute == prefix.absolute
            && self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("/")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = FactGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn parse_and_display_roundtrip() {
        for s in ["/", "/a/b", "/exp/*/amount", "/exp/#a1/amount", "../x", "a/b"] {
            assert_eq!(p(s).to_string(), s);
        }
    }

    #[test]
    fn normalization_folds_dots() {
        assert_eq!(p("/a/./b").to_string(), "/a/b");
        assert_eq!(p("/a/b/../c").to_string(), "/a/c");
        assert_eq!(p("a/../b").to_string(), "b");
        assert_eq!(p("../../x").to_string(), "../../x");
    }

    #[test]
    fn escape_above_root_rejected() {
        assert!(Path::parse("/..").is_err());
        assert!(Path::parse("/a/../..").is_err());
    }

    #[test]
    fn parse_rejects_malformed_segments() {
        assert!(Path::parse("").is_err());
        assert!(Path::parse("/a//b").is_err());
        assert!(Path::parse("/a/#").is_err());
    }

    #[test]
    fn resolve_relative_against_base() {
        let base = p("/exp/#a/amount");
        assert_eq!(p("../other").resolve(&base).unwrap(), p("/exp/#a/other"));
        assert_eq!(p("/abs").resolve(&base).unwrap(), p("/abs"));
        assert!(p("../../../../x").resolve(&base).is_err());
    }

    #[test]
    fn abstract_mapping() {
        let concrete = p("/exp/#a/amount");
        assert!(!concrete.is_abstract());
        assert_eq!(concrete.to_abstract(), p("/exp/*/amount"));
        assert!(p("/exp/*/amount").is_abstract());
    }

    #[test]
    fn populate_is_cartesian_in_order() {
        let path = p("/a/*/b/*/c");
        let concrete = path
            .populate(&[
                vec!["x".to_string(), "y".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ])
            .unwrap();
        let rendered: Vec<String> = concrete.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["/a/#x/b/#1/c", "/a/#x/b/#2/c", "/a/#y/b/#1/c", "/a/#y/b/#2/c"]
        );
    }

    #[test]
    fn populate_empty_collection_yields_nothing() {
        let path = p("/a/*/b");
        assert!(path.populate(&[vec![]]).unwrap().is_empty());
    }

    #[test]
    fn trailing_wildcard_is_legal() {
        let path = p("/exp/*");
        let concrete = path.populate(&[vec!["a".to_string()]]).unwrap();
        assert_eq!(concrete[0].to_string(), "/exp/#a");
    }

    #[test]
    fn parent_and_starts_with() {
        assert_eq!(p("/a/b").parent().unwrap(), p("/a"));
        assert_eq!(p("/a").parent().unwrap(), Path::root());
        assert!(Path::root().parent().is_none());
        assert!(p("/exp/#a/amount").starts_with(&p("/exp/#a")));
        assert!(!p("/exp/#a/amount").starts_with(&p("/exp/#b")));
    }
}
