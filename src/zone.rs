//! Hosted zone resolution for custom domains.

use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::provider::{Dns, HostedZone};

/// Finds the hosted zone that owns a domain.
pub struct HostedZoneResolver<'a> {
    dns: &'a dyn Dns,
}

impl<'a> HostedZoneResolver<'a> {
    /// Creates a resolver backed by a DNS provider.
    #[must_use]
    pub const fn new(dns: &'a dyn Dns) -> Self {
        Self { dns }
    }

    /// Walks the domain upward one label at a time and returns the first zone
    /// whose name matches exactly, so the closest ancestor wins.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ZoneNotFound`] if no ancestor has a zone, or
    /// the provider's error.
    pub async fn resolve(&self, domain: &str) -> Result<HostedZone> {
        let normalized = domain.trim_end_matches('.').to_ascii_lowercase();

        for candidate in candidates(&normalized) {
            debug!("Looking for hosted zone {candidate}");
            if let Some(zone) = self.dns.find_zone(candidate).await? {
                if zone.name.trim_end_matches('.').eq_ignore_ascii_case(candidate) {
                    debug!("Domain {domain} belongs to zone {} ({})", zone.name, zone.id);
                    return Ok(zone);
                }
            }
        }

        Err(ProvisionError::ZoneNotFound {
            domain: domain.to_string(),
        }
        .into())
    }
}

/// `a.b.c` yields `a.b.c`, `b.c`, `c`.
fn candidates(domain: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(domain), |name| name.split_once('.').map(|(_, rest)| rest))
        .filter(|name| !name.is_empty())
}
