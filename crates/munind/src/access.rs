//! Connection gate driven by the `allow` patterns.
//!
//! Each pattern is a regular expression tested against the peer's textual IP
//! address. A match anywhere in the address admits the peer; patterns are
//! not anchored unless they say so. No patterns means no peer is admitted.

use std::net::IpAddr;

use regex::Regex;
use tracing::warn;

const ACCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::access");

/// Compiled `allow` patterns.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    rules: Vec<Regex>,
}

impl AccessGuard {
    /// Compiles `patterns`, logging and skipping any that are malformed.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|pattern| compile(pattern.as_ref()))
            .collect();
        Self { rules }
    }

    /// Number of usable rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when no rule compiled, so every peer is denied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Tests a textual address against the rules; the first match admits.
    #[must_use]
    pub fn allows(&self, address: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(address))
    }

    /// Tests a peer address, presenting IPv4-mapped IPv6 peers as IPv4.
    #[must_use]
    pub fn allows_peer(&self, peer: IpAddr) -> bool {
        self.allows(&peer_text(peer))
    }
}

/// One-shot form of [`AccessGuard::allows`] over raw pattern strings.
#[must_use]
pub fn is_allowed<S: AsRef<str>>(address: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .filter_map(|pattern| compile(pattern.as_ref()))
        .any(|rule| rule.is_match(address))
}

/// Textual form of a peer address as matched by the rules.
#[must_use]
pub fn peer_text(peer: IpAddr) -> String {
    match peer {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or_else(|| v6.to_string(), |v4| v4.to_string()),
        IpAddr::V4(v4) => v4.to_string(),
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(rule) => Some(rule),
        Err(error) => {
            warn!(
                target: ACCESS_TARGET,
                pattern,
                %error,
                "ignoring malformed allow pattern"
            );
            None
        }
    }
}
