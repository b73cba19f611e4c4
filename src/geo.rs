//! Country resolution for inbound requests
//!
//! Geolocation is mocked: well-known local addresses map to [`LOCAL_LABEL`]
//! and every other address gets a country picked at random per request.
//! The [`CountryResolver`] trait is the seam for a real lookup.

use crate::config::GeoConfig;
use rand::Rng;
use std::collections::HashSet;

/// Label for requests from a local address
pub const LOCAL_LABEL: &str = "Local";

/// Label read downstream when a request carries no country
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Resolves a caller address to a country label
pub trait CountryResolver: Send + Sync {
    fn resolve(&self, address: &str) -> String;
}

/// Random-country resolver used by the demo
#[derive(Debug, Clone)]
pub struct MockGeoResolver {
    local_addresses: HashSet<String>,
    countries: Vec<String>,
}

impl MockGeoResolver {
    /// Build a resolver from a validated [`GeoConfig`]
    ///
    /// `GeoConfig` validation guarantees a non-empty country set.
    pub fn new(config: &GeoConfig) -> Self {
        Self {
            local_addresses: config.local_addresses().iter().cloned().collect(),
            countries: config.countries().to_vec(),
        }
    }

    /// Country labels this resolver can produce for non-local addresses
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn is_local(&self, address: &str) -> bool {
        self.local_addresses.contains(address)
    }
}

impl Default for MockGeoResolver {
    fn default() -> Self {
        Self::new(&GeoConfig::default())
    }
}

impl CountryResolver for MockGeoResolver {
    fn resolve(&self, address: &str) -> String {
        if self.is_local(address) {
            return LOCAL_LABEL.to_string();
        }

        if self.countries.is_empty() {
            return UNKNOWN_LABEL.to_string();
        }

        let mut rng = rand::rng();
        let index = rng.random_range(0..self.countries.len());
        self.countries[index].clone()
    }
}
