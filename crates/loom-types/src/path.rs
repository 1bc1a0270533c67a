//! Loom paths: the embedding namespace.
//!
//! A [`LoomPath`] is an ordered sequence of [`LoomId`] segments. Path
//! composition is concatenation of segment vectors — never string
//! interpolation — so `"a" ++ "b/c"` and `"a/b" ++ "c"` cannot collide
//! through a separator ambiguity. Rendering to a `/`-joined string is a
//! presentation detail only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A single validated loom identifier segment.
///
/// Segments are non-empty, contain no `/`, and use a conservative
/// character set (alphanumerics plus `-`, `_`, `.`), excluding `.` and
/// `..` themselves.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoomId(String);

impl LoomId {
    /// Validate and wrap a segment.
    pub fn new(segment: impl Into<String>) -> Result<Self, TypeError> {
        let segment = segment.into();
        let valid = !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(segment))
        } else {
            Err(TypeError::InvalidLoomId(segment))
        }
    }

    /// The raw segment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LoomId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LoomId> for String {
    fn from(id: LoomId) -> Self {
        id.0
    }
}

impl fmt::Debug for LoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoomId({})", self.0)
    }
}

impl fmt::Display for LoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered sequence of loom identifiers naming an embedded loom.
///
/// The empty path names the root loom.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoomPath(Vec<LoomId>);

impl LoomPath {
    /// The empty path (the root loom).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path with a single segment.
    pub fn of(segment: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self(vec![LoomId::new(segment)?]))
    }

    /// Parse a `/`-joined rendering. Empty input is the root path.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let segments = text
            .split('/')
            .map(LoomId::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }

    /// Concatenate: `self ++ other`. This is the namespace composition
    /// law — `ns(p1, ns(p2, name)) = ns(p1 ++ p2, name)`.
    pub fn join(&self, other: &LoomPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Extend by one segment.
    pub fn child(&self, segment: LoomId) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// All segments but the last, or `None` for the root path.
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The last segment, or `None` for the root path.
    pub fn leaf(&self) -> Option<&LoomId> {
        self.0.last()
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The segments in order.
    pub fn segments(&self) -> &[LoomId] {
        &self.0
    }

    /// Returns `true` if `prefix` is a (non-strict) prefix of this path.
    pub fn starts_with(&self, prefix: &LoomPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Debug for LoomPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoomPath({self})")
    }
}

impl fmt::Display for LoomPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn segment_validation() {
        assert!(LoomId::new("alpha-1").is_ok());
        assert!(LoomId::new("a.b_c").is_ok());
        assert!(LoomId::new("").is_err());
        assert!(LoomId::new("a/b").is_err());
        assert!(LoomId::new("..").is_err());
        assert!(LoomId::new("sp ace").is_err());
    }

    #[test]
    fn parse_and_display_roundtrip() {
        let path = LoomPath::parse("outer/inner/leaf").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.to_string(), "outer/inner/leaf");
        assert_eq!(LoomPath::parse("").unwrap(), LoomPath::root());
    }

    #[test]
    fn parent_and_leaf() {
        let path = LoomPath::parse("a/b").unwrap();
        assert_eq!(path.leaf().unwrap().as_str(), "b");
        assert_eq!(path.parent().unwrap(), LoomPath::parse("a").unwrap());
        assert!(LoomPath::root().parent().is_none());
    }

    #[test]
    fn prefix_check() {
        let path = LoomPath::parse("a/b/c").unwrap();
        assert!(path.starts_with(&LoomPath::root()));
        assert!(path.starts_with(&LoomPath::parse("a/b").unwrap()));
        assert!(!path.starts_with(&LoomPath::parse("b").unwrap()));
    }

    fn arb_path() -> impl Strategy<Value = LoomPath> {
        proptest::collection::vec("[a-z][a-z0-9-]{0,5}", 0..4).prop_map(|segments| {
            LoomPath(
                segments
                    .into_iter()
                    .map(|s| LoomId::new(s).unwrap())
                    .collect(),
            )
        })
    }

    proptest! {
        // join is associative: (p1 ++ p2) ++ p3 == p1 ++ (p2 ++ p3) —
        // the algebra behind ns(p1, ns(p2, name)) = ns(p1 ++ p2, name).
        #[test]
        fn join_is_associative(p1 in arb_path(), p2 in arb_path(), p3 in arb_path()) {
            prop_assert_eq!(p1.join(&p2).join(&p3), p1.join(&p2.join(&p3)));
        }

        #[test]
        fn root_is_identity(p in arb_path()) {
            prop_assert_eq!(LoomPath::root().join(&p), p.clone());
            prop_assert_eq!(p.join(&LoomPath::root()), p);
        }
    }
}
