//! Version parsing and constraint matching
//!
//! Versions are compared numerically as semantic version triples, so
//! `3.9.0 < 3.10.0`. Constraints accept the forms users type into pipeline
//! inputs:
//!
//! - exact: `3.10.1`
//! - prefix: `3`, `3.10`, `3.10.x`, `3.x`, `*`
//! - range: `>=3.10 <3.12`, `>= 3.8, < 4`, `~3.9`, `^3.7`
//! - alternatives: `3.8.x || >=3.11`

use crate::error::{Error, Result};
use semver::{BuildMetadata, Prerelease, Version, VersionReq};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A concrete tool version
///
/// Accepts one to three numeric components (missing ones are zero) with an
/// optional `-prerelease` and `+build` suffix. The original text is kept for
/// display and for naming cache directories.
#[derive(Debug, Clone)]
pub struct ToolVersion {
    raw: String,
    semver: Version,
}

impl ToolVersion {
    /// Parse a version string, returning `None` for anything that is not a version
    pub fn parse(text: &str) -> Option<Self> {
        let raw = text.trim();
        let body = raw.strip_prefix('v').unwrap_or(raw);

        let (body, build) = match body.split_once('+') {
            Some((b, meta)) => (b, Some(meta)),
            None => (body, None),
        };
        let (core, pre) = match body.split_once('-') {
            Some((c, p)) => (c, Some(p)),
            None => (body, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return None;
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            *slot = part.parse().ok()?;
        }

        let mut semver = Version::new(numbers[0], numbers[1], numbers[2]);
        if let Some(pre) = pre {
            semver.pre = Prerelease::new(pre).ok()?;
        }
        if let Some(build) = build {
            semver.build = BuildMetadata::new(build).ok()?;
        }

        Some(Self {
            raw: raw.to_string(),
            semver,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &Version {
        &self.semver
    }

    pub fn major(&self) -> u64 {
        self.semver.major
    }

    pub fn minor(&self) -> u64 {
        self.semver.minor
    }

    pub fn patch(&self) -> u64 {
        self.semver.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.semver.pre.is_empty()
    }

    /// The release core with prerelease and build metadata stripped
    pub fn core(&self) -> Version {
        Version::new(self.semver.major, self.semver.minor, self.semver.patch)
    }
}

impl PartialEq for ToolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ToolVersion {}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    /// Precedence order; `3.10` and `3.10.0` compare equal
    fn cmp(&self, other: &Self) -> Ordering {
        self.semver.cmp_precedence(&other.semver)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ToolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid_spec(s, "not a version number"))
    }
}

/// A parsed version constraint
#[derive(Debug, Clone)]
pub struct VersionSpec {
    raw: String,
    alternatives: Vec<VersionReq>,
    exact: Option<ToolVersion>,
}

impl VersionSpec {
    /// Parse a user-supplied constraint
    pub fn parse(spec: &str) -> Result<Self> {
        let raw = spec.trim();
        if raw.is_empty() {
            return Err(Error::invalid_spec(spec, "version spec is empty"));
        }

        let mut alternatives = Vec::new();
        for alternative in raw.split("||") {
            let translated = translate_alternative(alternative)
                .map_err(|reason| Error::invalid_spec(raw, reason))?;
            let req = VersionReq::parse(&translated)
                .map_err(|e| Error::invalid_spec(raw, e.to_string()))?;
            alternatives.push(req);
        }

        let core_parts = raw.split(['-', '+']).next().unwrap_or(raw).split('.').count();
        let exact = ToolVersion::parse(raw).filter(|_| core_parts == 3);

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
            exact,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pinned version when the spec names one full `major.minor.patch`
    pub fn exact_version(&self) -> Option<&ToolVersion> {
        self.exact.as_ref()
    }

    /// Whether `version` satisfies the constraint
    ///
    /// Prerelease versions only match a constraint that names them directly,
    /// unless `include_prerelease` is set, in which case a prerelease matches
    /// whenever its release core does (`3.11.0-beta.1` satisfies `3.11.x`).
    pub fn matches(&self, version: &ToolVersion, include_prerelease: bool) -> bool {
        self.alternatives.iter().any(|req| {
            req.matches(version.semver())
                || (include_prerelease && version.is_prerelease() && req.matches(&version.core()))
        })
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

const OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "~", "^"];

/// Turn one `||` alternative into `semver` comparator syntax
fn translate_alternative(alternative: &str) -> std::result::Result<String, String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;

    for token in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        if OPERATORS.contains(&token) {
            if pending_op.is_some() {
                return Err(format!("operator '{}' is missing a version", token));
            }
            pending_op = Some(token.to_string());
            continue;
        }
        let token = match pending_op.take() {
            Some(op) => format!("{}{}", op, token),
            None => token.to_string(),
        };
        tokens.push(translate_comparator(&token)?);
    }

    if let Some(op) = pending_op {
        return Err(format!("operator '{}' is missing a version", op));
    }
    if tokens.is_empty() {
        return Err("empty alternative".to_string());
    }
    Ok(tokens.join(", "))
}

fn translate_comparator(token: &str) -> std::result::Result<String, String> {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .ok_or_else(|| format!("'{}' is missing a version", token))?;
    let (op, version) = token.split_at(op_len);
    let version = version.strip_prefix('v').unwrap_or(version);

    if !op.is_empty() {
        if !OPERATORS.contains(&op) {
            return Err(format!("unknown operator '{}'", op));
        }
        return Ok(format!("{}{}", op, version));
    }

    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() > 3 {
        return Err(format!("'{}' has too many components", token));
    }
    let wildcard = |p: &str| matches!(p, "x" | "X" | "*");
    let first_wildcard = parts.iter().position(|p| wildcard(p));
    if let Some(i) = first_wildcard {
        if !parts[i..].iter().all(|p| wildcard(p)) {
            return Err(format!("'{}' has a number after a wildcard", token));
        }
    }

    match first_wildcard {
        Some(0) => Ok("*".to_string()),
        Some(1) => Ok(format!(">={}.0.0, <{}.0.0", parts[0], bump(parts[0])?)),
        Some(2) => Ok(format!(
            ">={}.{}.0, <{}.{}.0",
            parts[0],
            parts[1],
            parts[0],
            bump(parts[1])?
        )),
        Some(_) => Err(format!("'{}' has too many components", token)),
        None => Ok(format!("={}", version)),
    }
}

fn bump(component: &str) -> std::result::Result<u64, String> {
    component
        .parse::<u64>()
        .map(|n| n + 1)
        .map_err(|_| format!("'{}' is not a number", component))
}
