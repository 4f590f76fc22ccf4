//! Zone resolution
//!
//! Maps a configured domain name to the zone (root domain) that owns it.
//!
//! A configured name is a root domain iff it has exactly two labels
//! (`example.com`). This does not hold for multi-part public suffixes such as
//! `co.uk`: `example.co.uk` has three labels and is never treated as a zone.
//! Names are compared as supplied, without case folding.

use std::collections::BTreeSet;

/// Whether `name` is treated as the apex of a zone
pub fn is_root_domain(name: &str) -> bool {
    name.split('.').count() == 2
}

/// The set of configured root domains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootDomains {
    domains: BTreeSet<String>,
}

impl RootDomains {
    /// Collect the root domains out of a configured domain list
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .filter(|d| is_root_domain(d.as_ref()))
            .map(|d| d.as_ref().to_string())
            .collect();

        Self { domains }
    }

    /// Find the zone that owns `domain`
    ///
    /// Suffixes of `domain` are tried from the longest (the name itself) down
    /// to the last two labels; the first one that is a configured root domain
    /// wins. Returns `None` for names with fewer than two labels or when no
    /// suffix is configured.
    pub fn resolve(&self, domain: &str) -> Option<&str> {
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return None;
        }

        (0..labels.len() - 1)
            .map(|skip| labels[skip..].join("."))
            .find_map(|candidate| self.domains.get(&candidate))
            .map(String::as_str)
    }
}
