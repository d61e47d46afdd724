//! Entity versions
//!
//! Dogus use `major.minor.patch-nano` (e.g. `1.2.3-4`), components plain or
//! pre-release semantic versions (`1.2.3`, `1.2.3-rc.1`). Both are parsed
//! into the same ordered type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::DomainError;

/// A parsed, totally ordered version
///
/// Missing minor/patch parts default to zero, so `1.2` equals `1.2.0`.
/// A numeric suffix is the nano (packaging) revision; any other suffix is a
/// pre-release tag that orders below the plain release.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    nano: u64,
    pre: Option<String>,
    raw: String,
}

impl Version {
    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns `InvalidVersion` if the string is empty, has more than three
    /// numeric parts or a part is not a number.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| DomainError::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("version is empty"));
        }

        let (core, suffix) = match trimmed.split_once('-') {
            Some((core, suffix)) => (core, Some(suffix)),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid("at most three numeric parts are allowed"));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            *slot = part
                .parse::<u64>()
                .map_err(|_| invalid("version parts must be numeric"))?;
        }

        let (nano, pre) = match suffix {
            None => (0, None),
            Some("") => return Err(invalid("empty suffix after '-'")),
            Some(s) => match s.parse::<u64>() {
                Ok(n) => (n, None),
                Err(_) => (0, Some(s.to_string())),
            },
        };

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            nano,
            pre,
            raw: trimmed.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The version string as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_pre_release(a, b),
            })
            .then_with(|| self.nano.cmp(&other.nano))
    }
}

/// Semver precedence of pre-release tags
///
/// Dot-separated identifiers are compared left to right: numeric ones
/// numerically and below alphanumeric ones, the rest by ASCII order. A tag
/// that is a prefix of the other orders first.
fn compare_pre_release(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match (l.parse::<u64>(), r.parse::<u64>()) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => l.cmp(r),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
