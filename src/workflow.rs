//! Per-cycle registration workflow
//!
//! One cycle runs: probe, token refresh, status check, PIN check and
//! registration, stopping at the first step that decides the outcome or
//! fails. Nothing is retried within a cycle; the next tick starts over.

use crate::config::EnvironmentConfig;
use crate::error::CycleError;
use crate::models::{Credential, PortalParameters};
use crate::portal::{RegistrationApi, TokenSource};
use crate::probe::ConnectivityProbe;
use std::fmt;
use std::sync::Arc;

/// How a cycle ended when no step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No captive portal in the way
    Online,
    /// The gateway already lists the device as registered
    AlreadyRegistered,
    /// Guest lookup failed or no PIN is required
    NotEligible,
    Registered { url: String },
    Rejected { error: String },
}

impl CycleOutcome {
    /// Outcomes that leave the device offline
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::NotEligible | CycleOutcome::Rejected { .. })
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Online => write!(f, "online"),
            CycleOutcome::AlreadyRegistered => write!(f, "already registered"),
            CycleOutcome::NotEligible => write!(f, "user lookup failed or PIN not required"),
            CycleOutcome::Registered { url } => write!(f, "registered ({})", url),
            CycleOutcome::Rejected { error } => write!(f, "registration rejected: {}", error),
        }
    }
}

/// Drives one check cycle at a time.
///
/// `connect` binds a `RegistrationApi` to the credential chosen for the
/// cycle, so a scraped token never outlives the cycle it was found in.
pub struct Workflow<P, T, F> {
    probe: P,
    tokens: T,
    connect: F,
    env: Arc<EnvironmentConfig>,
}

impl<P, T, F, A> Workflow<P, T, F>
where
    P: ConnectivityProbe,
    T: TokenSource,
    F: Fn(Credential) -> A + Send + Sync,
    A: RegistrationApi,
{
    pub fn new(probe: P, tokens: T, connect: F, env: Arc<EnvironmentConfig>) -> Self {
        Self {
            probe,
            tokens,
            connect,
            env,
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        tracing::info!("Checking device status...");

        let Some(landing) = self.probe.probe().await? else {
            tracing::debug!("Device online; no captive portal detected");
            return Ok(CycleOutcome::Online);
        };

        tracing::info!(
            params = ?landing.params,
            "Captive portal detected; attempting registration flow"
        );

        let extracted = self.tokens.refresh_token(&landing).await;
        let credential = Credential::resolve(&self.env.api_token, &extracted);
        tracing::debug!(
            dynamic = !extracted.is_empty(),
            ?credential,
            "Using API credential"
        );

        let api = (self.connect)(credential);
        self.register(&api, &landing.params).await
    }

    async fn register(
        &self,
        api: &A,
        params: &PortalParameters,
    ) -> Result<CycleOutcome, CycleError> {
        let status = api
            .check_registration_status(params)
            .await
            .map_err(CycleError::StatusCheck)?;

        if status.is_successful() {
            tracing::info!("Device is already authenticated; registration complete");
            return Ok(CycleOutcome::AlreadyRegistered);
        }

        let property_id = status
            .property_id
            .ok_or(CycleError::MissingIdentifier("property_id"))?;
        let vlan_id = status
            .vlan_id
            .ok_or(CycleError::MissingIdentifier("vlan_id"))?;

        if property_id != self.env.property_id {
            tracing::debug!(
                gateway = property_id,
                configured = self.env.property_id,
                "Gateway reports a different property id than configured"
            );
        }

        tracing::info!(
            registration_status = %status.registration_status,
            property_id,
            vlan_id,
            "Device not registered; looking up guest"
        );

        let pin_required = api
            .check_pin_requirement(property_id)
            .await
            .map_err(CycleError::PinCheck)?;

        if !pin_required {
            tracing::error!("User lookup failed or PIN not required");
            return Ok(CycleOutcome::NotEligible);
        }

        let outcome = api
            .register_device(params, property_id, vlan_id)
            .await
            .map_err(CycleError::Registration)?;

        if outcome.is_successful() {
            tracing::info!(url = %outcome.url, "User registration successful");
            Ok(CycleOutcome::Registered { url: outcome.url })
        } else {
            tracing::error!(
                status = %outcome.status,
                error = %outcome.error,
                "Registration failed"
            );
            Ok(CycleOutcome::Rejected {
                error: outcome.error,
            })
        }
    }
}
