//! Semantic version types and range constraints.
//!
//! Provides Version and VersionReq types used for package versions as well as
//! runtime constraints such as `>=3.9,<3.12`. Constraints are parsed once into
//! a small comparator AST and matched without re-parsing.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
///
/// Missing minor/patch components parse as zero, so `3.11` is `3.11.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement: comma-separated comparators, all of which must hold
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionReq {
    pub comparators: Vec<Comparator>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exact,      // ==1.0.0, =1.0.0, 1.0.0, 1.0.*
    NotEqual,   // !=1.0.0
    Greater,    // >1.0.0
    GreaterEq,  // >=1.0.0
    Less,       // <1.0.0
    LessEq,     // <=1.0.0
    Tilde,      // ~1.0.0
    Caret,      // ^1.0.0
    Compatible, // ~=1.0
    Wildcard,   // *
}

/// Partial version for comparisons (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },

    #[error("Invalid version constraint '{input}': {reason}")]
    InvalidConstraint { input: String, reason: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    /// Attach a prerelease tag
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Semver precedence: build metadata is ignored
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers piecewise.
///
/// Numeric identifiers compare numerically and sort below alphanumeric ones;
/// when one list is a prefix of the other, the shorter one is lower.
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
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}

fn is_valid_identifiers(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|ident| {
            !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component: component.to_string(),
        });
    }
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

/// Split `core-prerelease` into its parts, validating the prerelease
fn split_prerelease(input: &str) -> Result<(&str, Option<String>), VersionError> {
    match input.split_once('-') {
        Some((core, pre)) => {
            if !is_valid_identifiers(pre) {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: pre.to_string(),
                });
            }
            Ok((core, Some(pre.to_string())))
        },
        None => Ok((input, None)),
    }
}

/// Parse up to three numeric components
fn parse_components(core: &str, input: &str) -> Result<Vec<u64>, VersionError> {
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(VersionError::InvalidFormat {
            input: input.to_string(),
        });
    }
    parts.into_iter().map(parse_number).collect()
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let unprefixed = input.strip_prefix('v').unwrap_or(input);

        if unprefixed.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        // Split on '+' for build metadata
        let (version_part, build) = match unprefixed.split_once('+') {
            Some((v, b)) => {
                if !is_valid_identifiers(b) {
                    return Err(VersionError::InvalidBuild {
                        build: b.to_string(),
                    });
                }
                (v, Some(b.to_string()))
            },
            None => (unprefixed, None),
        };

        let (core_part, prerelease) = split_prerelease(version_part)?;
        let numbers = parse_components(core_part, input)?;

        Ok(Version {
            major: numbers[0],
            minor: numbers.get(1).copied().unwrap_or(0),
            patch: numbers.get(2).copied().unwrap_or(0),
            prerelease,
            build,
        })
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

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    /// Precedence first, then build metadata so the order is total and
    /// agrees with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl VersionReq {
    /// Requirement that matches every version
    pub fn any() -> Self {
        Self {
            comparators: vec![Comparator::wildcard()],
        }
    }

    /// Requirement that matches exactly one version
    pub fn exact(version: &Version) -> Self {
        Self {
            comparators: vec![Comparator {
                op: Op::Exact,
                version: PartialVersion::from(version),
            }],
        }
    }

    /// Parse a version requirement string
    ///
    /// An empty string is the same as `*`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();

        if input.is_empty() || input == "*" {
            return Ok(Self::any());
        }

        let comparators = input
            .split(',')
            .map(|clause| Comparator::parse(clause.trim(), input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionReq { comparators })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.comparators.iter().all(|comp| comp.matches(version))
    }

    /// True when every comparator is a wildcard
    pub fn is_any(&self) -> bool {
        self.comparators.iter().all(|comp| comp.op == Op::Wildcard)
    }
}

impl Default for VersionReq {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, comp) in self.comparators.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", comp)?;
        }
        Ok(())
    }
}

impl Serialize for VersionReq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionReq {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        VersionReq::parse(&text).map_err(de::Error::custom)
    }
}

impl Comparator {
    fn wildcard() -> Self {
        Self {
            op: Op::Wildcard,
            version: PartialVersion {
                major: 0,
                minor: None,
                patch: None,
                prerelease: None,
            },
        }
    }

    /// Parse one clause of a requirement; `whole` is used for error messages
    fn parse(clause: &str, whole: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError::InvalidConstraint {
            input: whole.to_string(),
            reason: reason.to_string(),
        };

        if clause.is_empty() {
            return Err(invalid("empty clause"));
        }
        if clause == "*" {
            return Ok(Self::wildcard());
        }

        // Parse operator prefix (two-character operators first)
        let (op, version_str) = if let Some(stripped) = clause.strip_prefix("~=") {
            (Op::Compatible, stripped)
        } else if let Some(stripped) = clause.strip_prefix("==") {
            (Op::Exact, stripped)
        } else if let Some(stripped) = clause.strip_prefix("!=") {
            (Op::NotEqual, stripped)
        } else if let Some(stripped) = clause.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = clause.strip_prefix('^') {
            (Op::Caret, stripped)
        } else if let Some(stripped) = clause.strip_prefix('~') {
            (Op::Tilde, stripped)
        } else if let Some(stripped) = clause.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = clause.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = clause.strip_prefix('=') {
            (Op::Exact, stripped)
        } else {
            (Op::Exact, clause)
        };

        let version_str = version_str.trim();
        if version_str.is_empty() {
            return Err(invalid("missing version after operator"));
        }

        let (version, wildcard) = PartialVersion::parse(version_str).map_err(|e| invalid(&e.to_string()))?;

        if wildcard && !matches!(op, Op::Exact | Op::NotEqual) {
            return Err(invalid("'.*' is only allowed with == or !="));
        }
        if op == Op::Compatible && version.minor.is_none() {
            return Err(invalid("'~=' needs at least two version components"));
        }

        Ok(Comparator { op, version })
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let bound = self.version.to_version();
        match self.op {
            Op::Wildcard => true,
            Op::Exact => self.version.matches_exact(version),
            Op::NotEqual => !self.version.matches_exact(version),
            Op::Greater => version.cmp_precedence(&bound) == Ordering::Greater,
            Op::GreaterEq => version.cmp_precedence(&bound) != Ordering::Less,
            Op::Less => version.cmp_precedence(&bound) == Ordering::Less,
            Op::LessEq => version.cmp_precedence(&bound) != Ordering::Greater,
            Op::Tilde | Op::Caret | Op::Compatible => {
                version.cmp_precedence(&bound) != Ordering::Less
                    && self
                        .upper_bound()
                        .map_or(true, |upper| version.cmp_precedence(&upper) == Ordering::Less)
            },
        }
    }

    /// Exclusive upper bound for the range operators, `None` when the next
    /// version would not fit in a `u64` component
    fn upper_bound(&self) -> Option<Version> {
        let PartialVersion {
            major, minor, patch, ..
        } = self.version;

        match self.op {
            // ~1.2.3 and ~1.2 stop at the next minor, ~1 at the next major
            Op::Tilde => match minor {
                Some(minor) => next_version(major, Some(minor), None),
                None => next_version(major, None, None),
            },
            // ^ stops at the next change of the leftmost non-zero component
            Op::Caret => match (major, minor, patch) {
                (0, Some(0), Some(patch)) => next_version(0, Some(0), Some(patch)),
                (0, Some(minor), _) => next_version(0, Some(minor), None),
                _ => next_version(major, None, None),
            },
            // ~=X.Y means ==X.*, ~=X.Y.Z means ==X.Y.*
            Op::Compatible => match patch {
                Some(_) => next_version(major, Some(minor.unwrap_or(0)), None),
                None => next_version(major, None, None),
            },
            _ => None,
        }
    }
}

/// Smallest version above every version starting with the given components,
/// carrying into the next component on overflow
fn next_version(major: u64, minor: Option<u64>, patch: Option<u64>) -> Option<Version> {
    match (minor, patch) {
        (Some(minor), Some(patch)) => match patch.checked_add(1) {
            Some(patch) => Some(Version::new(major, minor, patch)),
            None => next_version(major, Some(minor), None),
        },
        (Some(minor), None) => match minor.checked_add(1) {
            Some(minor) => Some(Version::new(major, minor, 0)),
            None => next_version(major, None, None),
        },
        (None, _) => major.checked_add(1).map(|major| Version::new(major, 0, 0)),
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.op {
            Op::Wildcard => return f.write_str("*"),
            Op::Exact => "==",
            Op::NotEqual => "!=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
            Op::Compatible => "~=",
        };
        f.write_str(prefix)?;

        let v = &self.version;
        write!(f, "{}", v.major)?;
        if let Some(minor) = v.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(patch) = v.patch {
            write!(f, ".{}", patch)?;
        }

        let is_prefix_match = matches!(self.op, Op::Exact | Op::NotEqual) && v.patch.is_none();
        if is_prefix_match {
            f.write_str(".*")?;
        }

        if let Some(ref pre) = v.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl PartialVersion {
    /// Parse `1`, `1.2`, `1.2.3`, `1.2.3-beta` or `1.2.*`. A prerelease tag
    /// needs all three components.
    ///
    /// Returns the version and whether a trailing `.*` was present.
    fn parse(input: &str) -> Result<(Self, bool), VersionError> {
        let (body, wildcard) = match input.strip_suffix(".*") {
            Some(body) => (body, true),
            None => (input, false),
        };

        if body.contains('+') {
            return Err(VersionError::InvalidBuild {
                build: input.to_string(),
            });
        }

        let (core, prerelease) = split_prerelease(body)?;
        if wildcard && prerelease.is_some() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let numbers = parse_components(core, input)?;
        if (wildcard && numbers.len() == 3) || (prerelease.is_some() && numbers.len() < 3) {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok((
            PartialVersion {
                major: numbers[0],
                minor: numbers.get(1).copied(),
                patch: numbers.get(2).copied(),
                prerelease,
            },
            wildcard,
        ))
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }

    /// Check exact match; missing components match anything
    fn matches_exact(&self, version: &Version) -> bool {
        version.major == self.major
            && self.minor.map_or(true, |m| version.minor == m)
            && self.patch.map_or(true, |p| version.patch == p)
            && version.prerelease == self.prerelease
    }
}

impl From<&Version> for PartialVersion {
    fn from(version: &Version) -> Self {
        Self {
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            prerelease: version.prerelease.clone(),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn prerelease_strategy() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z][a-z0-9]{0,5}(\\.[0-9]{1,3})?")
    }

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prerelease_strategy(),
            build in prop::option::of("[a-zA-Z0-9]{1,8}")
        ) {
            let original = Version { major, minor, patch, prerelease, build };
            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn version_comparison_transitivity(
            a in (0u64..5, 0u64..5, 0u64..5),
            b in (0u64..5, 0u64..5, 0u64..5),
            c in (0u64..5, 0u64..5, 0u64..5),
        ) {
            let a = Version::new(a.0, a.1, a.2);
            let b = Version::new(b.0, b.1, b.2);
            let c = Version::new(c.0, c.1, c.2);

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {} but {} >= {}", a, b, c, a, c);
            }
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        }

        #[test]
        fn constraint_display_round_trip(
            major in 0u64..20,
            minor in prop::option::of(0u64..20),
            op in prop::sample::select(vec![">=", ">", "<", "<=", "==", "!=", "^", "~"]),
        ) {
            let text = match minor {
                Some(minor) => format!("{}{}.{}", op, major, minor),
                None => format!("{}{}", op, major),
            };
            let req = VersionReq::parse(&text).unwrap();
            let reparsed = VersionReq::parse(&req.to_string()).unwrap();
            prop_assert_eq!(reparsed, req);
        }
    }
}
