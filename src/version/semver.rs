use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Best-effort parse of a `MAJOR.MINOR.PATCH[-PRERELEASE]` string.
///
/// `Default` is the `0.0.0` sentinel returned for anything unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Everything after the first `-`, empty for stable releases
    pub prerelease: String,
}

impl ParsedVersion {
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Leading `.`-delimited token of the prerelease (`beta.1` -> `beta`)
    pub fn channel(&self) -> &str {
        self.prerelease.split('.').next().unwrap_or_default()
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

/// How two prereleases with the same numeric core are ranked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrereleaseOrdering {
    /// Plain string comparison (`rc.0` > `alpha.4`, but also `beta.9` > `beta.10`)
    #[default]
    Lexical,
    /// Semver precedence with numeric-aware identifiers. Prereleases that are
    /// not valid semver rank below all valid ones.
    Semver,
}

/// Parse a version string, degrading to the `0.0.0` sentinel instead of failing.
///
/// Examples:
/// - "1.2.3" -> (1, 2, 3, "")
/// - "15.3.0-canary.1" -> (15, 3, 0, "canary.1")
/// - "0.0.0-experimental-react" -> (0, 0, 0, "experimental-react")
/// - "1.2.3.4" -> (1, 2, 3, "")
/// - "invalid" -> (0, 0, 0, "")
pub fn parse_version(version: &str) -> ParsedVersion {
    let (core, prerelease) = match version.split_once('-') {
        Some((core, prerelease)) => (core, prerelease),
        None => (version, ""),
    };

    // Components past the third are ignored
    let mut parts = core.split('.').map(|part| part.parse::<u64>().ok());
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Some(major)), Some(Some(minor)), Some(Some(patch))) => ParsedVersion {
            major,
            minor,
            patch,
            prerelease: prerelease.to_string(),
        },
        _ => ParsedVersion::default(),
    }
}

/// Returns the prerelease channel of a version (`beta.1` -> `beta`), or an
/// empty string for stable and unparseable versions.
pub fn prerelease_channel(version: &str) -> String {
    parse_version(version).channel().to_string()
}

/// Compare two parsed versions by precedence.
///
/// The numeric core decides first. At an equal core a stable release outranks
/// every prerelease, and two prereleases are ranked by `ordering`.
pub fn compare_versions(
    a: &ParsedVersion,
    b: &ParsedVersion,
    ordering: PrereleaseOrdering,
) -> Ordering {
    a.core().cmp(&b.core()).then_with(|| {
        match (a.prerelease.is_empty(), b.prerelease.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_prereleases(&a.prerelease, &b.prerelease, ordering),
        }
    })
}

fn compare_prereleases(a: &str, b: &str, ordering: PrereleaseOrdering) -> Ordering {
    match ordering {
        PrereleaseOrdering::Lexical => a.cmp(b),
        // Prereleases semver rejects rank below every valid one and
        // compare lexically among themselves
        PrereleaseOrdering::Semver => {
            match (::semver::Prerelease::new(a), ::semver::Prerelease::new(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                (Ok(_), Err(_)) => Ordering::Greater,
                (Err(_), Ok(_)) => Ordering::Less,
                (Err(_), Err(_)) => a.cmp(b),
            }
        }
    }
}
