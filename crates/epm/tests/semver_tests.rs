//! Integration tests for semver parsing and range resolution

use epm::{Constraint, Range, Version};

fn versions(list: &[&str]) -> Vec<Version> {
    list.iter().map(|v| Version::parse(v).unwrap()).collect()
}

#[test]
fn test_version_parsing() {
    let v = Version::parse("v1.2.3-alpha.1+build.123").unwrap();
    assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    assert_eq!(v.prerelease, Some("alpha.1".to_string()));
    assert_eq!(v.build, Some("build.123".to_string()));
    assert!(v.is_prerelease());
}

#[test]
fn test_prerelease_ordering() {
    let ordered = versions(&[
        "1.0.0-alpha",
        "1.0.0-alpha.1",
        "1.0.0-alpha.beta",
        "1.0.0-beta",
        "1.0.0-beta.2",
        "1.0.0-beta.11",
        "1.0.0-rc.1",
        "1.0.0",
    ]);

    for pair in ordered.windows(2) {
        assert!(pair[0] < pair[1], "{} should sort below {}", pair[0], pair[1]);
    }
}

#[test]
fn test_invalid_version() {
    assert!(Version::parse("1.2").is_err());
    assert!(Version::parse("1").is_err());
    assert!(Version::parse("a.b.c").is_err());
    assert!(Version::parse("").is_err());
}

#[test]
fn test_caret_constraint_major_nonzero() {
    let c = Constraint::parse("^1.2.3").unwrap();

    // Matches: >=1.2.3 <2.0.0
    assert!(c.matches(&Version::new(1, 2, 3)));
    assert!(c.matches(&Version::new(1, 9, 9)));

    assert!(!c.matches(&Version::new(1, 2, 2)));
    assert!(!c.matches(&Version::new(2, 0, 0)));
    assert!(!c.matches(&Version::new(0, 9, 9)));
}

#[test]
fn test_tilde_constraint() {
    let c = Constraint::parse("~1.2.3").unwrap();

    // Matches: >=1.2.3 <1.3.0
    assert!(c.matches(&Version::new(1, 2, 3)));
    assert!(c.matches(&Version::new(1, 2, 9)));

    assert!(!c.matches(&Version::new(1, 3, 0)));
}

#[test]
fn test_wildcards() {
    let patch = Constraint::parse("1.2.x").unwrap();
    assert!(patch.matches(&Version::new(1, 2, 999)));
    assert!(!patch.matches(&Version::new(1, 3, 0)));

    let minor = Constraint::parse("1.*").unwrap();
    assert!(minor.matches(&Version::new(1, 99, 0)));
    assert!(!minor.matches(&Version::new(2, 0, 0)));
}

#[test]
fn test_invalid_range() {
    assert!(Range::parse("invalid").is_err());
    assert!(Range::parse(">=").is_err());
    assert!(Range::parse("^1.x.3").is_err());
}

#[test]
fn test_range_forms() {
    let known = versions(&["0.9.0", "1.0.0", "1.4.2", "1.5.0", "2.0.0", "2.1.0", "3.0.0"]);
    let best = |range: &str| {
        Range::parse(range)
            .unwrap()
            .max_satisfying(&known)
            .map(|v| v.to_string())
    };

    assert_eq!(best("^1.0.0").as_deref(), Some("1.5.0"));
    assert_eq!(best("~1.4.0").as_deref(), Some("1.4.2"));
    assert_eq!(best(">=1.0.0 <2.0.0").as_deref(), Some("1.5.0"));
    assert_eq!(best("1.0.0 - 2.0.0").as_deref(), Some("2.0.0"));
    assert_eq!(best("^0.9.0 || ^2.0.0").as_deref(), Some("2.1.0"));
    assert_eq!(best("2.x").as_deref(), Some("2.1.0"));
    assert_eq!(best("*").as_deref(), Some("3.0.0"));
    assert_eq!(best("").as_deref(), Some("3.0.0"));
    assert_eq!(best("=1.0.0").as_deref(), Some("1.0.0"));
    assert_eq!(best("^4.0.0"), None);
}

#[test]
fn test_short_range_forms() {
    let known = versions(&["0.4.1", "0.4.7", "0.5.0", "1.1.0", "1.2.0", "1.2.9", "1.3.0", "2.0.0", "2.1.0"]);
    let best = |range: &str| {
        Range::parse(range)
            .unwrap()
            .max_satisfying(&known)
            .map(|v| v.to_string())
    };

    assert_eq!(best("^1.2").as_deref(), Some("1.3.0"));
    assert_eq!(best("^1").as_deref(), Some("1.3.0"));
    assert_eq!(best("^1.x").as_deref(), Some("1.3.0"));
    assert_eq!(best("^0.4").as_deref(), Some("0.4.7"));
    assert_eq!(best("~1.2").as_deref(), Some("1.2.9"));
    assert_eq!(best("~0.4").as_deref(), Some("0.4.7"));
    assert_eq!(best(">=1.2").as_deref(), Some("2.1.0"));
    assert_eq!(best(">=1.2 <2").as_deref(), Some("1.3.0"));
    assert_eq!(best(">1.2").as_deref(), Some("2.1.0"));
    assert_eq!(best("<=1.2").as_deref(), Some("1.2.9"));
    assert_eq!(best("<1.2").as_deref(), Some("1.1.0"));
    assert_eq!(best("1.0 - 2.0").as_deref(), Some("2.0.0"));
    assert_eq!(best("0.4 - 1.1").as_deref(), Some("1.1.0"));
    assert_eq!(best("^3"), None);
}

#[test]
fn test_short_ranges_keep_lower_bound() {
    let r = Range::parse("^1.2").unwrap();
    assert!(!r.matches(&Version::new(1, 1, 9)));
    assert!(r.matches(&Version::new(1, 2, 0)));
    assert!(!r.matches(&Version::new(2, 0, 0)));

    let r = Range::parse(">1.2").unwrap();
    assert!(!r.matches(&Version::new(1, 2, 9)));
    assert!(r.matches(&Version::new(1, 3, 0)));
}

#[test]
fn test_prereleases_need_opt_in() {
    let known = versions(&["1.0.0", "1.1.0-beta.1", "1.1.0-beta.2"]);

    let caret = Range::parse("^1.0.0").unwrap();
    assert_eq!(caret.max_satisfying(&known), Some(&Version::new(1, 0, 0)));

    let opted_in = Range::parse(">=1.1.0-beta.1").unwrap();
    assert_eq!(
        opted_in.max_satisfying(&known).map(ToString::to_string).as_deref(),
        Some("1.1.0-beta.2")
    );
}

#[test]
fn test_max_satisfying_is_maximal() {
    let known = versions(&[
        "0.1.0", "0.1.5", "0.2.0", "1.0.0-rc.1", "1.0.0", "1.0.1", "1.2.0", "1.10.0", "2.0.0-alpha",
        "2.0.0", "2.3.4", "10.0.0",
    ]);
    let ranges = [
        "^0.1.0", "0.1.x", "^1.0.0", ">1.0.0 <1.10.0", "<=2.0.0", "1.x || 10.x", ">=2.0.0-alpha",
        "^3.0.0", "*", "^1.2", "~0.1", ">=1.2 <2", "<=1.2", "0.2 - 1.2",
    ];

    for expr in ranges {
        let range = Range::parse(expr).unwrap();
        let satisfying: Vec<&Version> = known.iter().filter(|v| range.matches(v)).collect();

        match range.max_satisfying(&known) {
            Some(best) => {
                assert!(known.contains(best), "{}: result not from the known set", expr);
                assert!(range.matches(best), "{}: {} does not satisfy", expr, best);
                assert!(
                    satisfying.iter().all(|v| *v <= best),
                    "{}: {} is not the maximum",
                    expr,
                    best
                );
            }
            None => assert!(satisfying.is_empty(), "{}: missed a satisfying version", expr),
        }
    }
}
