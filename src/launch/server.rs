//! Server bundle versions.
//!
//! Server bundles are stored at the bucket root as
//! `server-<major>.<minor>.<patch>.tar.gz`.

use std::cmp::Ordering;

/// Version of a packaged tile server bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    /// Version text as it appears in the key.
    raw: String,
    /// Numeric components.
    parts: Vec<u64>,
}

impl ServerVersion {
    /// Parses a dotted numeric version such as `1.10.0`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let parts = raw
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    part.parse().ok()
                }
            })
            .collect::<Option<Vec<u64>>>()?;

        Some(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Parses a version from a `server-<version>.tar.gz` key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::parse(key.strip_prefix("server-")?.strip_suffix(".tar.gz")?)
    }

    /// Version text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Object key of this bundle.
    #[must_use]
    pub fn key(&self) -> String {
        format!("server-{}.tar.gz", self.raw)
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts
            .cmp(&other.parts)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
