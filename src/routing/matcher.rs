//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route path patterns into segments
//! - Match request paths segment by segment
//! - Rank matches so the most specific pattern wins
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex; matching is a single pass over the segments
//! - `{name}` matches exactly one non-empty segment
//! - `*` and `{name+}` are greedy, must come last, and take one or more segments
//! - Paths with `.` or `..` segments, literal or percent-encoded, match nothing

use thiserror::Error;

/// Errors raised while parsing a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("greedy segment must be the last segment")]
    GreedyNotLast,

    #[error("empty segment name in '{0}'")]
    EmptyName(String),

    #[error("malformed segment '{0}'")]
    Malformed(String),
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the exact text.
    Literal(String),
    /// Matches any single non-empty segment.
    Named(String),
    /// Matches every remaining segment (at least one).
    Greedy,
}

impl Segment {
    /// Rank used for precedence: literal beats named beats greedy.
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 2,
            Segment::Named(_) => 1,
            Segment::Greedy => 0,
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern such as `/session/{token}/status` or `/irma/*`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let rest = raw
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let mut segments = Vec::new();
        if !rest.is_empty() {
            let parts: Vec<&str> = rest.split('/').collect();
            let last = parts.len() - 1;
            for (i, part) in parts.into_iter().enumerate() {
                let segment = parse_segment(part)?;
                if segment == Segment::Greedy && i != last {
                    return Err(PatternError::GreedyNotLast);
                }
                segments.push(segment);
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Shape of the pattern with segment names erased.
    ///
    /// `/session/{token}` and `/session/{id}` share a shape and cannot be told apart
    /// by any request.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Named(_) => out.push_str("{}"),
                Segment::Greedy => out.push('*'),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// Specificity key. Larger keys are more specific.
    ///
    /// Segment ranks compare position by position; when one key is a prefix of
    /// another, the longer key wins.
    pub fn specificity(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::rank).collect()
    }

    /// Returns true if the request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let rest = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Greedy => {
                    return parts
                        .get(i..)
                        .is_some_and(|rest| rest.iter().any(|p| !p.is_empty()));
                }
                Segment::Named(_) => match parts.get(i) {
                    Some(part) if !part.is_empty() => {}
                    _ => return false,
                },
                Segment::Literal(text) => match parts.get(i) {
                    Some(part) if part == text => {}
                    _ => return false,
                },
            }
        }

        parts.len() == self.segments.len()
    }
}

/// Returns true if any segment of `path` is `.` or `..` once `%2e`, `%2f` and
/// `%5c` are decoded.
///
/// A backend that normalizes dot segments would otherwise serve a different
/// resource than the one the route was resolved for.
pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        if !segment.contains('.') && !segment.contains('%') {
            return false;
        }
        let decoded = segment
            .to_ascii_lowercase()
            .replace("%2e", ".")
            .replace("%2f", "/")
            .replace("%5c", "/");
        decoded
            .split(['/', '\\'])
            .any(|part| part == "." || part == "..")
    })
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(part: &str) -> Result<Segment, PatternError> {
    if part == "*" {
        return Ok(Segment::Greedy);
    }

    if let Some(inner) = part.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| PatternError::Malformed(part.to_string()))?;
        let (name, greedy) = match inner.strip_suffix('+') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() {
            return Err(PatternError::EmptyName(part.to_string()));
        }
        if name.contains(['{', '}', '+']) {
            return Err(PatternError::Malformed(part.to_string()));
        }
        return Ok(if greedy {
            Segment::Greedy
        } else {
            Segment::Named(name.to_string())
        });
    }

    if part.is_empty() || part.contains(['{', '}', '*']) {
        return Err(PatternError::Malformed(part.to_string()));
    }

    Ok(Segment::Literal(part.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let p = pattern("/session");
        assert!(p.matches("/session"));
        assert!(!p.matches("/session/abc"));
        assert!(!p.matches("/Session"));
        assert!(!p.matches("/"));
    }

    #[test]
    fn test_named_segment() {
        let p = pattern("/session/{token}/status");
        assert!(p.matches("/session/abc/status"));
        assert!(!p.matches("/session//status"));
        assert!(!p.matches("/session/abc"));
        assert!(!p.matches("/session/abc/status/extra"));
    }

    #[test]
    fn test_greedy_segment() {
        let star = pattern("/irma/*");
        let proxy = pattern("/irma/{proxy+}");
        for p in [&star, &proxy] {
            assert!(p.matches("/irma/anything/here"));
            assert!(p.matches("/irma/session"));
            assert!(!p.matches("/irma"));
            assert!(!p.matches("/irma/"));
            assert!(p.matches("/irma//x"));
            assert!(!p.matches("/irmax/session"));
        }
        assert_eq!(star.canonical(), proxy.canonical());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(PathPattern::parse("session"), Err(PatternError::MissingLeadingSlash));
        assert_eq!(PathPattern::parse("/irma/*/x"), Err(PatternError::GreedyNotLast));
        assert!(matches!(PathPattern::parse("/a/{}"), Err(PatternError::EmptyName(_))));
        assert!(matches!(PathPattern::parse("/a/{x"), Err(PatternError::Malformed(_))));
        assert!(matches!(PathPattern::parse("/a//b"), Err(PatternError::Malformed(_))));
    }

    #[test]
    fn test_specificity_ordering() {
        let literal = pattern("/irma/session").specificity();
        let named = pattern("/irma/{id}").specificity();
        let greedy = pattern("/irma/*").specificity();
        assert!(literal > named);
        assert!(named > greedy);
        // Longer pattern wins over its own prefix.
        assert!(pattern("/session/{t}/status").specificity() > pattern("/session/{t}").specificity());
    }

    #[test]
    fn test_dot_segments() {
        for path in [
            "/irma/../session",
            "/irma/./x",
            "/irma/%2e%2e/session",
            "/irma/%2E%2E/session",
            "/irma/.%2e/session",
            "/irma/x%2f..%2fsession",
            "/irma/..\\session",
            "/..",
        ] {
            assert!(has_dot_segment(path), "{path}");
        }
        for path in ["/irma/session", "/irma/file.json", "/irma/...", "/irma/%41", "/"] {
            assert!(!has_dot_segment(path), "{path}");
        }
    }

    #[test]
    fn test_canonical_erases_names() {
        assert_eq!(pattern("/session/{token}").canonical(), "/session/{}");
        assert_eq!(pattern("/").canonical(), "/");
    }
}
