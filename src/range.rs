//! Semantic version range grammar.
//!
//! ```text
//! Expr   := Or
//! Or     := And ("||" And)*
//! And    := Atom ( ("&&" | WS) Atom )*
//! Atom   := "*" | "x" | "X"
//!         | "^" Ver | "~" Ver
//!         | (">=" | "<=" | ">" | "<") Ver
//!         | Ver
//! Ver    := digits ("." (digits|"x"|"X") ("." (digits|"x"|"X"))? )?
//!           ("-" … | "+" …)?
//! ```
//!
//! Every atom collapses, at parse time, into a half-open version interval
//! (`lower..upper`, each bound independently inclusive or absent). This keeps
//! `satisfies` a total, panic-free comparison over two optional bounds
//! regardless of which surface syntax produced the atom.

use crate::error::{Error, Result};
use crate::version::Version;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct Bound {
    lower: Option<(Version, bool)>,
    upper: Option<(Version, bool)>,
}

impl Bound {
    fn everything() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    fn matches(&self, v: &Version) -> bool {
        if let Some((ref lv, inclusive)) = self.lower {
            let ord = v.cmp(lv);
            if inclusive {
                if ord == Ordering::Less {
                    return false;
                }
            } else if ord != Ordering::Greater {
                return false;
            }
        }
        if let Some((ref uv, inclusive)) = self.upper {
            let ord = v.cmp(uv);
            if inclusive {
                if ord == Ordering::Greater {
                    return false;
                }
            } else if ord != Ordering::Less {
                return false;
            }
        }
        true
    }
}

/// An immutable, parsed version range with a pure `satisfies` predicate.
#[derive(Debug, Clone)]
pub struct Range {
    /// Disjunction of conjunctions: `groups[i]` is an AND-clause, any of
    /// which satisfying the version satisfies the whole range.
    groups: Vec<Vec<Bound>>,
    source: String,
}

impl Range {
    pub fn satisfies(&self, version: &Version) -> bool {
        self.groups
            .iter()
            .any(|clause| clause.iter().all(|b| b.matches(version)))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Parse a range expression. Never panics; malformed syntax is reported as
/// [`Error::RangeSyntax`].
pub fn parse(s: &str) -> Result<Range> {
    let source = s.to_string();
    let mut groups = Vec::new();
    for or_clause in s.split("||") {
        let or_clause = or_clause.trim();
        if or_clause.is_empty() {
            return Err(Error::RangeSyntax(format!("empty clause in '{}'", s)));
        }
        let mut bounds = Vec::new();
        for and_clause in or_clause.split("&&") {
            for token in tokenize(and_clause)? {
                bounds.push(parse_atom(&token)?);
            }
        }
        if bounds.is_empty() {
            return Err(Error::RangeSyntax(format!("empty clause in '{}'", s)));
        }
        groups.push(bounds);
    }
    if groups.is_empty() {
        return Err(Error::RangeSyntax("empty range expression".to_string()));
    }
    Ok(Range { groups, source })
}

/// `satisfies(range, version)`, exposed for external reuse without going
/// through a fallible parse every time.
pub fn satisfies(range: &Range, version: &Version) -> bool {
    range.satisfies(version)
}

/// The newest candidate satisfying `range`, or `None` if none do.
pub fn best_match<'a>(range: &Range, candidates: &'a [Version]) -> Option<&'a Version> {
    candidates
        .iter()
        .filter(|v| range.satisfies(v))
        .max_by(|a, b| a.cmp(b))
}

/// Rewrite a bare concrete version (`"1.2.3"`, `"1"`, `"1.2"`) into its caret
/// range (`"^1.2.3"`); anything already carrying an operator or wildcard is
/// returned unchanged. Idempotent by construction: the rewritten form starts
/// with `^` and will never match the bare-digits pattern again.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_bare_version(trimmed) {
        format!("^{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// `Some(version)` if `s` is a bare concrete version with no operator or
/// wildcard — used by the registry adapter to decide whether a requested
/// range string names one exact version rather than a range to search.
pub fn exact_version(s: &str) -> Option<Version> {
    let trimmed = s.trim();
    if is_bare_version(trimmed) {
        Version::parse(trimmed)
    } else {
        None
    }
}

fn is_bare_version(s: &str) -> bool {
    let mut parts = s.split('.');
    let Some(first) = parts.next() else {
        return false;
    };
    if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let mut count = 1;
    for part in parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        count += 1;
        if count > 3 {
            return false;
        }
    }
    true
}

/// Split one AND-clause into its atom tokens. An AND boundary is exactly
/// where a fresh operator token (`>=`, `<=`, `>`, `<`, `^`, `~`) or a new
/// bare version begins after whitespace — a space right after an operator,
/// before its version operand, is not a boundary.
fn tokenize(clause: &str) -> Result<Vec<String>> {
    let bytes = clause.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }

        let op_len = if clause[i..].starts_with(">=") || clause[i..].starts_with("<=") {
            2
        } else if matches!(bytes[i], b'>' | b'<' | b'^' | b'~') {
            1
        } else {
            0
        };

        if op_len > 0 {
            let op = &clause[i..i + op_len];
            i += op_len;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let start = i;
            while i < len && is_version_char(bytes[i]) {
                i += 1;
            }
            if start == i {
                return Err(Error::RangeSyntax(format!(
                    "operator '{}' missing operand in '{}'",
                    op, clause
                )));
            }
            tokens.push(format!("{}{}", op, &clause[start..i]));
            continue;
        }

        if matches!(bytes[i], b'*' | b'x' | b'X')
            && (i + 1 >= len || !is_version_char(bytes[i + 1]))
        {
            tokens.push(clause[i..i + 1].to_string());
            i += 1;
            continue;
        }

        let start = i;
        while i < len && is_version_char(bytes[i]) {
            i += 1;
        }
        if start == i {
            return Err(Error::RangeSyntax(format!(
                "unexpected character '{}' in '{}'",
                bytes[i] as char, clause
            )));
        }
        tokens.push(clause[start..i].to_string());
    }

    Ok(tokens)
}

fn is_version_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'+'
}

fn parse_atom(token: &str) -> Result<Bound> {
    if token == "*" || token.eq_ignore_ascii_case("x") {
        return Ok(Bound::everything());
    }
    if let Some(rest) = token.strip_prefix(">=") {
        let v = parse_zero_filled(rest, token)?.0;
        return Ok(Bound {
            lower: Some((v, true)),
            upper: None,
        });
    }
    if let Some(rest) = token.strip_prefix("<=") {
        let v = parse_zero_filled(rest, token)?.0;
        return Ok(Bound {
            lower: None,
            upper: Some((v, true)),
        });
    }
    if let Some(rest) = token.strip_prefix('>') {
        let v = parse_zero_filled(rest, token)?.0;
        return Ok(Bound {
            lower: Some((v, false)),
            upper: None,
        });
    }
    if let Some(rest) = token.strip_prefix('<') {
        let v = parse_zero_filled(rest, token)?.0;
        return Ok(Bound {
            lower: None,
            upper: Some((v, false)),
        });
    }
    if let Some(rest) = token.strip_prefix('^') {
        let base = parse_zero_filled(rest, token)?.0;
        let hi = if base.major > 0 {
            Version::new(base.major + 1, 0, 0)
        } else if base.minor > 0 {
            Version::new(0, base.minor + 1, 0)
        } else {
            Version::new(0, 0, base.patch + 1)
        };
        return Ok(Bound {
            lower: Some((base, true)),
            upper: Some((hi, false)),
        });
    }
    if let Some(rest) = token.strip_prefix('~') {
        let (base, count) = parse_zero_filled(rest, token)?;
        let hi = if count <= 1 {
            Version::new(base.major + 1, 0, 0)
        } else {
            Version::new(base.major, base.minor + 1, 0)
        };
        return Ok(Bound {
            lower: Some((base, true)),
            upper: Some((hi, false)),
        });
    }
    parse_exact(token)
}

/// Parse a (possibly partial, possibly wildcarded) version, zero-filling
/// every missing or wildcarded component. Returns the version plus the
/// number of dot-separated components actually written (1–3), needed by
/// `~` to distinguish `~X` from `~X.Y`.
fn parse_zero_filled(s: &str, original: &str) -> Result<(Version, usize)> {
    let s = strip_suffix(s);
    let mut comps = [0u64; 3];
    let mut count = 0;
    for (idx, part) in s.split('.').enumerate() {
        if idx >= 3 {
            return Err(Error::RangeSyntax(format!(
                "too many version components in '{}'",
                original
            )));
        }
        if part.is_empty() {
            return Err(Error::RangeSyntax(format!(
                "malformed version in '{}'",
                original
            )));
        }
        comps[idx] = if part.eq_ignore_ascii_case("x") {
            0
        } else {
            part.parse::<u64>()
                .map_err(|_| Error::RangeSyntax(format!("malformed version in '{}'", original)))?
        };
        count += 1;
    }
    if count == 0 {
        return Err(Error::RangeSyntax(format!(
            "malformed version in '{}'",
            original
        )));
    }
    Ok((Version::new(comps[0], comps[1], comps[2]), count))
}

/// Parse the `Ver` production used by the bare exact-match atom, where a
/// missing or wildcarded trailing component widens the match instead of
/// being zero-filled.
fn parse_exact(token: &str) -> Result<Bound> {
    let s = strip_suffix(token);
    let mut written: Vec<Option<u64>> = Vec::new();
    for (idx, part) in s.split('.').enumerate() {
        if idx >= 3 {
            return Err(Error::RangeSyntax(format!(
                "too many version components in '{}'",
                token
            )));
        }
        if part.is_empty() {
            return Err(Error::RangeSyntax(format!(
                "malformed version in '{}'",
                token
            )));
        }
        if part.eq_ignore_ascii_case("x") {
            written.push(None);
        } else {
            let n = part
                .parse::<u64>()
                .map_err(|_| Error::RangeSyntax(format!("malformed version in '{}'", token)))?;
            written.push(Some(n));
        }
    }
    if written.is_empty() || written[0].is_none() {
        return Err(Error::RangeSyntax(format!(
            "exact version must start with a number in '{}'",
            token
        )));
    }

    let effective = written.iter().take_while(|c| c.is_some()).count();
    let major = written[0].unwrap();
    let minor = written.get(1).and_then(|c| *c).unwrap_or(0);
    let patch = written.get(2).and_then(|c| *c).unwrap_or(0);

    let (lo, hi_exclusive) = match effective {
        1 => (
            Version::new(major, 0, 0),
            Some(Version::new(major + 1, 0, 0)),
        ),
        2 => (
            Version::new(major, minor, 0),
            Some(Version::new(major, minor + 1, 0)),
        ),
        _ => (Version::new(major, minor, patch), None),
    };

    Ok(match hi_exclusive {
        Some(hi) => Bound {
            lower: Some((lo, true)),
            upper: Some((hi, false)),
        },
        None => Bound {
            lower: Some((lo.clone(), true)),
            upper: Some((lo, true)),
        },
    })
}

fn strip_suffix(s: &str) -> &str {
    let s = s.split('+').next().unwrap_or(s);
    s.split('-').next().unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sat(range: &str, version: &str) -> bool {
        parse(range).unwrap().satisfies(&v(version))
    }

    #[test]
    fn caret_ranges() {
        assert!(sat("^1.2.3", "1.2.3"));
        assert!(!sat("^1.2.3", "2.0.0"));
        assert!(!sat("^0.2.3", "0.3.0"));
        assert!(!sat("^0.0.3", "0.0.4"));
        assert!(sat("^0.0.3", "0.0.3"));
    }

    #[test]
    fn tilde_ranges() {
        assert!(sat("~1.2.3", "1.2.99"));
        assert!(!sat("~1.2.3", "1.3.0"));
    }

    #[test]
    fn compound_and() {
        assert!(sat(">=1.0.0 <2.0.0", "1.5.0"));
        assert!(!sat(">=1.0.0 <2.0.0", "2.0.0"));
        assert!(!sat(">=1.0.0 <2.0.0", "0.9.9"));
    }

    #[test]
    fn or_clauses() {
        assert!(sat("1.x || 2.x", "2.5.0"));
        assert!(!sat("1.x || 2.x", "3.0.0"));
    }

    #[test]
    fn gte_wildcard_right_hand_side() {
        assert!(sat(">=16.x", "16.0.0"));
        assert!(sat(">=16.x", "100.0.0"));
        assert!(!sat(">=16.x", "15.9.9"));
    }

    #[test]
    fn best_match_picks_newest() {
        let range = parse("^4.17.0").unwrap();
        let candidates = vec![v("4.17.21"), v("4.17.20"), v("4.17.19")];
        assert_eq!(best_match(&range, &candidates), Some(&v("4.17.21")));
    }

    #[test]
    fn best_match_empty_when_nothing_matches() {
        let range = parse("^5.0.0").unwrap();
        let candidates = vec![v("4.17.21")];
        assert_eq!(best_match(&range, &candidates), None);
    }

    #[test]
    fn normalize_rewrites_bare_versions() {
        assert_eq!(normalize("1.2.3"), "^1.2.3");
        assert_eq!(normalize("1"), "^1");
        assert_eq!(normalize("^1.2.3"), "^1.2.3");
        assert_eq!(normalize("*"), "*");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["1.2.3", "^1.2.3", "*", ">=1.0.0 <2.0.0", "1.x"] {
            let once = normalize(raw);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn best_match_iff_satisfies_single_candidate() {
        for (range_str, version_str) in [("^1.0.0", "1.5.0"), ("^1.0.0", "2.0.0"), ("*", "0.0.1")]
        {
            let range = parse(range_str).unwrap();
            let version = v(version_str);
            let matched = best_match(&range, std::slice::from_ref(&version)).is_some();
            assert_eq!(matched, range.satisfies(&version));
        }
    }

    #[test]
    fn malformed_ranges_error_instead_of_panicking() {
        assert!(parse(">=").is_err());
        assert!(parse("#nonsense").is_err());
        assert!(parse("1.2.3.4.5").is_err());
    }
}
