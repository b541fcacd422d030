use serde::Serialize;
use std::fmt;

/// Serialized event document as returned to clients
pub type Payload = serde_json::Value;

/// Namespace prefix for event records in the cache store
pub const EVENT_KEY_PREFIX: &str = "event:";

/// Cache store key derived from an external event identifier.
///
/// The mapping is a pure prefix concatenation, so a key is never reused for a
/// different identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_event(event_id: &str) -> Self {
        Self(format!("{}{}", EVENT_KEY_PREFIX, event_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a lookup result originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    CacheHit,
    StoreHit,
    StoreMiss,
    StoreError,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheHit => "CACHE_HIT",
            Self::StoreHit => "STORE_HIT",
            Self::StoreMiss => "STORE_MISS",
            Self::StoreError => "STORE_ERROR",
        }
    }

    /// Value of the `x-cache-status` response header
    pub fn cache_status(&self) -> &'static str {
        match self {
            Self::CacheHit => "HIT",
            Self::StoreHit | Self::StoreMiss | Self::StoreError => "MISS",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single lookup.
///
/// Built only through the constructors below: a cache or store hit always
/// carries a payload, a miss or error never does.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    payload: Option<Payload>,
    provenance: Provenance,
}

impl LookupResult {
    pub fn cache_hit(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            provenance: Provenance::CacheHit,
        }
    }

    pub fn store_hit(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            provenance: Provenance::StoreHit,
        }
    }

    pub fn store_miss() -> Self {
        Self {
            payload: None,
            provenance: Provenance::StoreMiss,
        }
    }

    pub fn store_error() -> Self {
        Self {
            payload: None,
            provenance: Provenance::StoreError,
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }
}
