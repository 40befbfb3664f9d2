//! Data models for SkyAdmin portal registration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Query parameters the splash page attaches to its redirect URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortalKey {
    /// Device (node) id
    Ui,
    Ni,
    Uip,
    /// Client MAC address
    Ma,
    Rn,
    /// Gateway port, used as the VLAN
    Port,
    Rad,
    Pp,
    Pms,
    /// Client IP address
    Sip,
    Os,
}

impl PortalKey {
    pub const ALL: [PortalKey; 11] = [
        PortalKey::Ui,
        PortalKey::Ni,
        PortalKey::Uip,
        PortalKey::Ma,
        PortalKey::Rn,
        PortalKey::Port,
        PortalKey::Rad,
        PortalKey::Pp,
        PortalKey::Pms,
        PortalKey::Sip,
        PortalKey::Os,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PortalKey::Ui => "UI",
            PortalKey::Ni => "NI",
            PortalKey::Uip => "UIP",
            PortalKey::Ma => "MA",
            PortalKey::Rn => "RN",
            PortalKey::Port => "PORT",
            PortalKey::Rad => "RAD",
            PortalKey::Pp => "PP",
            PortalKey::Pms => "PMS",
            PortalKey::Sip => "SIP",
            PortalKey::Os => "OS",
        }
    }

    /// Match a query key exactly (keys are case sensitive)
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Recognized parameters extracted from a captive portal redirect URL.
///
/// Only keys that were present in the query string are stored; the first
/// value wins when a key is repeated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalParameters {
    values: BTreeMap<PortalKey, String>,
}

impl PortalParameters {
    /// Parse a URL string and collect the recognized query parameters
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(input)?;
        let mut values = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            if let Some(key) = PortalKey::from_query_key(&key) {
                values.entry(key).or_insert_with(|| value.into_owned());
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: PortalKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Value for `key`, or `fallback` when the portal did not send it
    pub fn get_or<'a>(&'a self, key: PortalKey, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// API token sent in the `api-token` header
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Effective credential for one cycle: a non-empty scraped token
    /// supersedes the configured default.
    pub fn resolve(default: &Credential, extracted: &str) -> Credential {
        if extracted.is_empty() {
            default.clone()
        } else {
            Credential::new(extracted)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "Credential({}…)", visible)
    }
}

/// `{"data": {...}}` wrapper used by the portals endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Body of the registration status check
#[derive(Debug, Clone, Serialize)]
pub struct StatusCheckRequest<'a> {
    pub vlan: &'a str,
    pub mac_address: &'a str,
    pub ip_address: &'a str,
    pub nseid: &'a str,
}

/// Response from the registration status check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalRegistrationStatus {
    #[serde(default)]
    pub registration_status: String,

    #[serde(default)]
    pub property_id: Option<u32>,

    #[serde(default)]
    pub vlan_id: Option<u32>,
}

impl PortalRegistrationStatus {
    pub fn is_successful(&self) -> bool {
        self.registration_status == "Successful"
    }
}

/// Body of the guest lookup
#[derive(Debug, Clone, Serialize)]
pub struct PinCheckRequest<'a> {
    pub property_id: u32,
    pub lastname: &'a str,
    pub roomnumber: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinRequirement {
    pub pin_required: bool,
}

/// Body of the device registration
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest<'a> {
    pub nseid: &'a str,
    pub property_id: u32,
    pub vlan_id: u32,
    pub mac_address: &'a str,
    pub ip_address: &'a str,
    pub registration_method_id: u32,
    pub rateplan_id: u32,
    pub last_name: &'a str,
    pub room_number: &'a str,
}

/// Response from the registration endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationOutcome {
    #[serde(rename = "registration_status", default)]
    pub status: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub error: String,
}

impl RegistrationOutcome {
    pub fn is_successful(&self) -> bool {
        self.status == "Successful"
    }
}
