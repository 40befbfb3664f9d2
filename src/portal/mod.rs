//! Portal backend abstraction layer
//!
//! The workflow talks to the gateway vendor through two traits: a
//! `TokenSource` that scrapes the current API token from the splash page,
//! and a `RegistrationApi` bound to one credential. `skyadmin` provides the
//! production implementations.

pub mod skyadmin;

pub use skyadmin::{PortalTokenSource, SkyAdminClient};

use crate::error::ApiError;
use crate::models::{PortalParameters, PortalRegistrationStatus, RegistrationOutcome};
use crate::probe::PortalLanding;
use async_trait::async_trait;

/// Scrapes the API token the splash page front end was built with
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns an empty string when no token could be found
    async fn refresh_token(&self, landing: &PortalLanding) -> String;
}

/// Registration endpoints, authenticated with a single credential
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    async fn check_registration_status(
        &self,
        params: &PortalParameters,
    ) -> Result<PortalRegistrationStatus, ApiError>;

    /// Whether the guest record exists and requires a PIN
    async fn check_pin_requirement(&self, property_id: u32) -> Result<bool, ApiError>;

    async fn register_device(
        &self,
        params: &PortalParameters,
        property_id: u32,
        vlan_id: u32,
    ) -> Result<RegistrationOutcome, ApiError>;
}
