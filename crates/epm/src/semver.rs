//! Semantic versioning parser and range matching
//!
//! Provides semver parsing, SemVer 2.0 precedence, and the range expressions
//! used in manifest `dependencies` (`^1.0.0`, `>=1.2.0 <2.0.0 || 3.x`, ...).

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during semver parsing
#[derive(Debug, Error)]
pub enum SemverError {
    /// Invalid version format
    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    /// Invalid constraint format
    #[error("Invalid constraint format: {0}")]
    InvalidConstraint(String),

    /// Invalid pre-release tag
    #[error("Invalid pre-release tag: {0}")]
    InvalidPrerelease(String),
}

/// Semantic version (MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD])
///
/// Equality and ordering follow SemVer precedence, so build metadata is ignored
/// when comparing two versions.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// A single version comparator
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Exact version (=1.2.3 or 1.2.3)
    Exact(Version),

    /// Caret range (^1.2.3 → >=1.2.3 <2.0.0)
    Caret(Version),

    /// Tilde range (~1.2.3 → >=1.2.3 <1.3.0)
    Tilde(Version),

    /// Greater than (>1.2.3)
    GreaterThan(Version),

    /// Greater than or equal (>=1.2.3)
    GreaterThanOrEqual(Version),

    /// Less than (<1.2.3)
    LessThan(Version),

    /// Less than or equal (<=1.2.3)
    LessThanOrEqual(Version),

    /// Wildcard (1.2.*, 1.x, 1)
    Wildcard(u64, Option<u64>),

    /// Half-open interval `>=min <max`, from operators on partial versions (^1.2, ~1)
    Between(Version, Version),

    /// Any version (*)
    Any,
}

/// A version range: a disjunction (`||`) of conjunctions of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    alternatives: Vec<Vec<Constraint>>,
}

impl Version {
    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let s = s.trim();

        // Remove 'v' prefix if present
        let s = s.strip_prefix('v').unwrap_or(s);

        // Split by + to separate build metadata
        let (version_part, build) = match s.split_once('+') {
            Some((v, b)) => {
                validate_identifiers(b, false)?;
                (v, Some(b.to_string()))
            }
            None => (s, None),
        };

        // Split by - to separate prerelease
        let (core_version, prerelease) = match version_part.split_once('-') {
            Some((v, p)) => {
                validate_identifiers(p, true)?;
                (v, Some(p.to_string()))
            }
            None => (version_part, None),
        };

        // Parse MAJOR.MINOR.PATCH
        let parts: Vec<&str> = core_version.split('.').collect();
        if parts.len() != 3 {
            return Err(SemverError::InvalidVersion(format!(
                "Expected MAJOR.MINOR.PATCH, got '{}'",
                s
            )));
        }

        let major = parse_numeric(parts[0], "major")?;
        let minor = parse_numeric(parts[1], "minor")?;
        let patch = parse_numeric(parts[2], "patch")?;

        Ok(Version {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }

    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Whether two versions share MAJOR.MINOR.PATCH
    pub fn same_release(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }
}

fn parse_numeric(part: &str, which: &str) -> Result<u64, SemverError> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return Err(SemverError::InvalidVersion(format!(
            "Invalid {} version: {}",
            which, part
        )));
    }
    part.parse()
        .map_err(|_| SemverError::InvalidVersion(format!("Invalid {} version: {}", which, part)))
}

/// Dot-separated identifiers: non-empty, `[0-9A-Za-z-]`.
fn validate_identifiers(s: &str, prerelease: bool) -> Result<(), SemverError> {
    let valid = !s.is_empty()
        && s.split('.').all(|id| {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    match (valid, prerelease) {
        (true, _) => Ok(()),
        (false, true) => Err(SemverError::InvalidPrerelease(s.to_string())),
        (false, false) => Err(SemverError::InvalidVersion(format!(
            "Invalid build metadata: {}",
            s
        ))),
    }
}

/// Compare pre-release strings identifier by identifier (SemVer 2.0 §11.4)
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(n), Ok(m)) => n.cmp(&m),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| {
                // A version with a prerelease sorts below the same release without one
                match (&self.prerelease, &other.prerelease) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(a), Some(b)) => compare_prerelease(a, b),
                }
            })
    }
}

impl Constraint {
    /// Parse a constraint string
    ///
    /// Operators accept partial versions and desugar them to bounds:
    /// `^1.2` is `>=1.2.0 <2.0.0`, `~1` is `>=1.0.0 <2.0.0`, `<=1.2` is `<1.3.0`.
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let s = s.trim();

        if s.is_empty() || s == "*" || s == "x" || s == "X" {
            return Ok(Constraint::Any);
        }

        // Check for operators
        if let Some(rest) = s.strip_prefix(">=") {
            return Ok(match parse_operand(rest)? {
                Operand::Full(v) => Constraint::GreaterThanOrEqual(v),
                Operand::Partial(major, minor) => {
                    Constraint::GreaterThanOrEqual(lower_bound(major, minor))
                }
                Operand::Any => Constraint::Any,
            });
        }

        if let Some(rest) = s.strip_prefix("<=") {
            return Ok(match parse_operand(rest)? {
                Operand::Full(v) => Constraint::LessThanOrEqual(v),
                Operand::Partial(major, minor) => Constraint::LessThan(next_release(major, minor)),
                Operand::Any => Constraint::Any,
            });
        }

        if let Some(rest) = s.strip_prefix('>') {
            return match parse_operand(rest)? {
                Operand::Full(v) => Ok(Constraint::GreaterThan(v)),
                Operand::Partial(major, minor) => {
                    Ok(Constraint::GreaterThanOrEqual(next_release(major, minor)))
                }
                Operand::Any => Err(unsatisfiable(s)),
            };
        }

        if let Some(rest) = s.strip_prefix('<') {
            return match parse_operand(rest)? {
                Operand::Full(v) => Ok(Constraint::LessThan(v)),
                Operand::Partial(major, minor) => Ok(Constraint::LessThan(lower_bound(major, minor))),
                Operand::Any => Err(unsatisfiable(s)),
            };
        }

        if let Some(rest) = s.strip_prefix('^') {
            return Ok(match parse_operand(rest)? {
                Operand::Full(v) => Constraint::Caret(v),
                Operand::Partial(major, minor) => {
                    // ^0.0 := >=0.0.0 <0.1.0, ^0 := >=0.0.0 <1.0.0
                    let max = if major > 0 {
                        next_release(major, None)
                    } else {
                        next_release(major, minor)
                    };
                    Constraint::Between(lower_bound(major, minor), max)
                }
                Operand::Any => Constraint::Any,
            });
        }

        if let Some(rest) = s.strip_prefix('~') {
            return Ok(match parse_operand(rest)? {
                Operand::Full(v) => Constraint::Tilde(v),
                Operand::Partial(major, minor) => {
                    Constraint::Between(lower_bound(major, minor), next_release(major, minor))
                }
                Operand::Any => Constraint::Any,
            });
        }

        // `=1.2.3`, `1.2.3`, and partial versions (1.2.*, 1.x, 1.2, 1)
        let rest = s.strip_prefix('=').unwrap_or(s);
        Ok(match parse_operand(rest)? {
            Operand::Full(v) => Constraint::Exact(v),
            Operand::Partial(major, minor) => Constraint::Wildcard(major, minor),
            Operand::Any => Constraint::Any,
        })
    }

    /// Parse wildcard constraint (1.2.*, 1.*, 1.x, 1.2)
    fn parse_wildcard(s: &str) -> Result<Self, SemverError> {
        let is_wild = |p: &str| p == "*" || p == "x" || p == "X";
        let invalid = || SemverError::InvalidConstraint(format!("Invalid wildcard: {}", s));
        let parts: Vec<&str> = s.split('.').collect();

        if parts.len() > 3 || is_wild(parts[0]) {
            return if parts.iter().all(|p| is_wild(p)) {
                Ok(Constraint::Any)
            } else {
                Err(invalid())
            };
        }

        let major = parts[0].parse().map_err(|_| invalid())?;

        match parts.get(1) {
            None => Ok(Constraint::Wildcard(major, None)),
            Some(p) if is_wild(p) => {
                if parts.len() == 3 && !is_wild(parts[2]) {
                    return Err(invalid());
                }
                Ok(Constraint::Wildcard(major, None))
            }
            Some(p) => {
                let minor = p.parse().map_err(|_| invalid())?;
                match parts.get(2) {
                    None => Ok(Constraint::Wildcard(major, Some(minor))),
                    Some(p) if is_wild(p) => Ok(Constraint::Wildcard(major, Some(minor))),
                    Some(_) => Err(invalid()),
                }
            }
        }
    }

    /// Check if a version satisfies this constraint
    ///
    /// Pre-release filtering is applied by [`Range::matches`], not here.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Constraint::Any => true,

            Constraint::Exact(v) => version == v,

            Constraint::Caret(v) => {
                // ^1.2.3 := >=1.2.3 <2.0.0
                // ^0.2.3 := >=0.2.3 <0.3.0
                // ^0.0.3 := >=0.0.3 <0.0.4
                if v.major > 0 {
                    version >= v && version.major == v.major
                } else if v.minor > 0 {
                    version >= v && version.major == 0 && version.minor == v.minor
                } else {
                    version >= v
                        && version.major == 0
                        && version.minor == 0
                        && version.patch == v.patch
                }
            }

            Constraint::Tilde(v) => {
                // ~1.2.3 := >=1.2.3 <1.3.0
                version >= v && version.major == v.major && version.minor == v.minor
            }

            Constraint::Between(min, max) => version >= min && version < max,

            Constraint::GreaterThan(v) => version > v,
            Constraint::GreaterThanOrEqual(v) => version >= v,
            Constraint::LessThan(v) => version < v,
            Constraint::LessThanOrEqual(v) => version <= v,

            Constraint::Wildcard(major, minor) => {
                if let Some(m) = minor {
                    version.major == *major && version.minor == *m
                } else {
                    version.major == *major
                }
            }
        }
    }

    /// The version this comparator is anchored on, if any
    fn anchor(&self) -> Option<&Version> {
        match self {
            Constraint::Exact(v)
            | Constraint::Caret(v)
            | Constraint::Tilde(v)
            | Constraint::GreaterThan(v)
            | Constraint::GreaterThanOrEqual(v)
            | Constraint::LessThan(v)
            | Constraint::LessThanOrEqual(v)
            | Constraint::Between(v, _) => Some(v),
            Constraint::Wildcard(..) | Constraint::Any => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => write!(f, "*"),
            Constraint::Exact(v) => write!(f, "{}", v),
            Constraint::Caret(v) => write!(f, "^{}", v),
            Constraint::Tilde(v) => write!(f, "~{}", v),
            Constraint::GreaterThan(v) => write!(f, ">{}", v),
            Constraint::GreaterThanOrEqual(v) => write!(f, ">={}", v),
            Constraint::LessThan(v) => write!(f, "<{}", v),
            Constraint::LessThanOrEqual(v) => write!(f, "<={}", v),
            Constraint::Between(min, max) => write!(f, ">={} <{}", min, max),
            Constraint::Wildcard(major, Some(minor)) => write!(f, "{}.{}.*", major, minor),
            Constraint::Wildcard(major, None) => write!(f, "{}.*", major),
        }
    }
}

impl Range {
    /// Parse a range expression
    ///
    /// Accepts `||`-separated alternatives; each alternative is either a hyphen
    /// range (`1.0.0 - 2.0.0`) or whitespace-separated constraints that must all
    /// hold (`>=1.2.0 <2.0.0`). An empty expression matches any version.
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let alternatives = s
            .split("||")
            .map(parse_conjunction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Range { alternatives })
    }

    /// Check if a version satisfies this range
    ///
    /// A pre-release version only satisfies an alternative that names a
    /// pre-release of the same MAJOR.MINOR.PATCH, so `^1.0.0` never selects
    /// `1.1.0-beta`.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|conjunction| {
            conjunction.iter().all(|c| c.matches(version))
                && (!version.is_prerelease()
                    || conjunction.iter().any(|c| {
                        c.anchor()
                            .is_some_and(|a| a.is_prerelease() && a.same_release(version))
                    }))
        })
    }

    /// Pick the highest version in `candidates` satisfying this range
    pub fn max_satisfying<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        candidates.into_iter().filter(|v| self.matches(v)).max()
    }
}

/// Version operand of a comparator
enum Operand {
    Full(Version),
    /// Major and optional minor; missing components are wildcards
    Partial(u64, Option<u64>),
    Any,
}

fn parse_operand(s: &str) -> Result<Operand, SemverError> {
    let s = s.trim();
    let core = s.strip_prefix('v').unwrap_or(s);
    let release = core.split(['-', '+']).next().unwrap_or(core);
    let complete = release.split('.').count() == 3 && !release.contains(['*', 'x', 'X']);

    if complete {
        return Version::parse(core).map(Operand::Full);
    }
    if release.len() != core.len() {
        return Err(SemverError::InvalidConstraint(format!(
            "Pre-release or build metadata on a partial version: {}",
            s
        )));
    }

    match Constraint::parse_wildcard(core)? {
        Constraint::Wildcard(major, minor) => Ok(Operand::Partial(major, minor)),
        _ => Ok(Operand::Any),
    }
}

/// Smallest release matching a partial version (1.2 -> 1.2.0)
fn lower_bound(major: u64, minor: Option<u64>) -> Version {
    Version::new(major, minor.unwrap_or(0), 0)
}

/// First release past a partial version (1.2 -> 1.3.0, 1 -> 2.0.0)
fn next_release(major: u64, minor: Option<u64>) -> Version {
    match minor {
        Some(minor) => Version::new(major, minor.saturating_add(1), 0),
        None => Version::new(major.saturating_add(1), 0, 0),
    }
}

fn unsatisfiable(s: &str) -> SemverError {
    SemverError::InvalidConstraint(format!("'{}' matches no version", s))
}

fn parse_conjunction(s: &str) -> Result<Vec<Constraint>, SemverError> {
    let s = s.trim();

    // 1.2 - 2.3 := >=1.2.0 <2.4.0
    if let Some((low, high)) = s.split_once(" - ") {
        let mut bounds = Vec::with_capacity(2);
        match parse_operand(low)? {
            Operand::Full(v) => bounds.push(Constraint::GreaterThanOrEqual(v)),
            Operand::Partial(major, minor) => {
                bounds.push(Constraint::GreaterThanOrEqual(lower_bound(major, minor)))
            }
            Operand::Any => {}
        }
        match parse_operand(high)? {
            Operand::Full(v) => bounds.push(Constraint::LessThanOrEqual(v)),
            Operand::Partial(major, minor) => {
                bounds.push(Constraint::LessThan(next_release(major, minor)))
            }
            Operand::Any => {}
        }
        if bounds.is_empty() {
            bounds.push(Constraint::Any);
        }
        return Ok(bounds);
    }

    // Re-attach operators written apart from their version (">= 1.2.3")
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<&str> = None;
    for token in s.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            if pending.is_some() {
                return Err(SemverError::InvalidConstraint(s.to_string()));
            }
            pending = Some(token);
            continue;
        }
        match pending.take() {
            Some(op) => tokens.push(format!("{}{}", op, token)),
            None => tokens.push(token.to_string()),
        }
    }
    if pending.is_some() {
        return Err(SemverError::InvalidConstraint(s.to_string()));
    }

    if tokens.is_empty() {
        return Ok(vec![Constraint::Any]);
    }

    tokens.iter().map(|t| Constraint::parse(t)).collect()
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, conjunction) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            for (j, constraint) in conjunction.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", constraint)?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Range {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert!(v.prerelease.is_none());
        assert!(v.build.is_none());
    }

    #[test]
    fn test_parse_version_with_v_prefix() {
        let v = Version::parse("v1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_version_with_prerelease_and_build() {
        let v = Version::parse("1.2.3-alpha.1+build.123").unwrap();
        assert_eq!(v.prerelease, Some("alpha.1".to_string()));
        assert_eq!(v.build, Some("build.123".to_string()));
    }

    #[test]
    fn test_reject_malformed_versions() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(Version::parse("1.2.-3").is_err());
        assert!(Version::parse("1.2.3-").is_err());
        assert!(Version::parse("1.2.3-a..b").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_prerelease_precedence() {
        // 1.0.0-alpha < 1.0.0-alpha.1 < 1.0.0-alpha.beta < 1.0.0-beta
        //   < 1.0.0-beta.2 < 1.0.0-beta.11 < 1.0.0-rc.1 < 1.0.0
        let ordered = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ordered.windows(2) {
            let a = Version::parse(pair[0]).unwrap();
            let b = Version::parse(pair[1]).unwrap();
            assert!(a < b, "{} should sort before {}", a, b);
        }
    }

    #[test]
    fn test_build_metadata_ignored_for_precedence() {
        let a = Version::parse("1.0.0+one").unwrap();
        let b = Version::parse("1.0.0+two").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_caret_match_zero_major() {
        let c = Constraint::parse("^0.2.3").unwrap();

        assert!(c.matches(&Version::new(0, 2, 3)));
        assert!(c.matches(&Version::new(0, 2, 4)));

        assert!(!c.matches(&Version::new(0, 2, 2)));
        assert!(!c.matches(&Version::new(0, 3, 0)));
        assert!(!c.matches(&Version::new(1, 0, 0)));
    }

    #[test]
    fn test_partial_versions_are_wildcards() {
        assert_eq!(Constraint::parse("1.2").unwrap(), Constraint::Wildcard(1, Some(2)));
        assert_eq!(Constraint::parse("1").unwrap(), Constraint::Wildcard(1, None));
        assert_eq!(Constraint::parse("1.x").unwrap(), Constraint::Wildcard(1, None));
        assert_eq!(Constraint::parse("1.2.X").unwrap(), Constraint::Wildcard(1, Some(2)));
        assert_eq!(Constraint::parse("x.x").unwrap(), Constraint::Any);
        assert!(Constraint::parse("1.x.3").is_err());
    }

    #[test]
    fn test_operators_on_partial_versions() {
        let between = |min: Version, max: Version| Constraint::Between(min, max);

        assert_eq!(
            Constraint::parse("^1.2").unwrap(),
            between(Version::new(1, 2, 0), Version::new(2, 0, 0))
        );
        assert_eq!(
            Constraint::parse("^1.x").unwrap(),
            between(Version::new(1, 0, 0), Version::new(2, 0, 0))
        );
        assert_eq!(
            Constraint::parse("^0.0").unwrap(),
            between(Version::new(0, 0, 0), Version::new(0, 1, 0))
        );
        assert_eq!(
            Constraint::parse("~0.4").unwrap(),
            between(Version::new(0, 4, 0), Version::new(0, 5, 0))
        );
        assert_eq!(
            Constraint::parse(">=1.2").unwrap(),
            Constraint::GreaterThanOrEqual(Version::new(1, 2, 0))
        );
        assert_eq!(
            Constraint::parse(">1").unwrap(),
            Constraint::GreaterThanOrEqual(Version::new(2, 0, 0))
        );
        assert_eq!(
            Constraint::parse("<=1.2").unwrap(),
            Constraint::LessThan(Version::new(1, 3, 0))
        );
        assert_eq!(
            Constraint::parse("<1.2").unwrap(),
            Constraint::LessThan(Version::new(1, 2, 0))
        );
        assert_eq!(Constraint::parse("=1.2").unwrap(), Constraint::Wildcard(1, Some(2)));
        assert_eq!(Constraint::parse("^*").unwrap(), Constraint::Any);
        assert!(Constraint::parse("<*").is_err());
        assert!(Constraint::parse("^1.2-beta").is_err());
    }

    #[test]
    fn test_partial_hyphen_range() {
        let r = Range::parse("1.0 - 2.0").unwrap();
        assert_eq!(r.to_string(), ">=1.0.0 <2.1.0");
        assert!(r.matches(&Version::new(2, 0, 9)));
        assert!(!r.matches(&Version::new(2, 1, 0)));
    }

    #[test]
    fn test_range_conjunction() {
        let r = Range::parse(">=1.2.0 <2.0.0").unwrap();
        assert!(r.matches(&Version::new(1, 2, 0)));
        assert!(r.matches(&Version::new(1, 9, 9)));
        assert!(!r.matches(&Version::new(2, 0, 0)));
        assert!(!r.matches(&Version::new(1, 1, 9)));
    }

    #[test]
    fn test_range_disjunction() {
        let r = Range::parse("^1.0.0 || ~3.1.0").unwrap();
        assert!(r.matches(&Version::new(1, 4, 0)));
        assert!(r.matches(&Version::new(3, 1, 7)));
        assert!(!r.matches(&Version::new(2, 0, 0)));
        assert!(!r.matches(&Version::new(3, 2, 0)));
    }

    #[test]
    fn test_range_hyphen() {
        let r = Range::parse("1.0.0 - 1.5.0").unwrap();
        assert!(r.matches(&Version::new(1, 0, 0)));
        assert!(r.matches(&Version::new(1, 5, 0)));
        assert!(!r.matches(&Version::new(1, 5, 1)));
    }

    #[test]
    fn test_range_detached_operator() {
        let r = Range::parse(">= 1.2.3").unwrap();
        assert!(r.matches(&Version::new(1, 2, 3)));
        assert!(Range::parse(">=").is_err());
    }

    #[test]
    fn test_range_excludes_unrequested_prereleases() {
        let r = Range::parse("^1.0.0").unwrap();
        assert!(!r.matches(&Version::parse("1.1.0-beta.1").unwrap()));

        let r = Range::parse(">=1.1.0-beta.0 <2.0.0").unwrap();
        assert!(r.matches(&Version::parse("1.1.0-beta.1").unwrap()));
        assert!(!r.matches(&Version::parse("1.2.0-beta.1").unwrap()));
        assert!(r.matches(&Version::new(1, 2, 0)));
    }

    #[test]
    fn test_max_satisfying() {
        let versions = vec![
            Version::new(1, 0, 0),
            Version::new(1, 3, 0),
            Version::new(1, 2, 5),
            Version::new(2, 0, 0),
        ];
        let r = Range::parse("^1.0.0").unwrap();
        assert_eq!(r.max_satisfying(&versions), Some(&Version::new(1, 3, 0)));

        let r = Range::parse("^3.0.0").unwrap();
        assert_eq!(r.max_satisfying(&versions), None);
    }

    #[test]
    fn test_empty_range_matches_any_release() {
        let r = Range::parse("").unwrap();
        assert!(r.matches(&Version::new(7, 0, 0)));
        assert_eq!(r, Range::parse("*").unwrap());
    }
}
