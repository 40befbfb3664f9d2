//! SkyAdmin portal implementation
//!
//! Hotel networks managed by SkyAdmin redirect unregistered devices to
//! `splash.skyadmin.io`. Registration goes through the skyadmin.io API,
//! authenticated with an `api-token` header whose value is baked into the
//! splash page's JavaScript bundle and rotated from time to time.

use crate::config::EnvironmentConfig;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{
    Credential, Envelope, PinCheckRequest, PinRequirement, PortalKey, PortalParameters,
    PortalRegistrationStatus, RegistrationOutcome, RegistrationRequest, StatusCheckRequest,
};
use crate::parser;
use crate::portal::{RegistrationApi, TokenSource};
use crate::probe::PortalLanding;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

pub const API_BASE_URL: &str = "https://skyadmin.io/api/";

const STATUS_ENDPOINT: &str = "portals";
const PIN_ENDPOINT: &str = "portals";
const REGISTRATION_ENDPOINT: &str = "portalregistrations";
const API_TOKEN_HEADER: &str = "api-token";

/// Longest response body kept in an error
const MAX_ERROR_BODY: usize = 200;

/// Registration API client bound to one credential
#[derive(Clone)]
pub struct SkyAdminClient {
    client: Arc<HttpClient>,
    base_url: Url,
    env: Arc<EnvironmentConfig>,
    credential: Credential,
}

impl SkyAdminClient {
    pub fn new(
        client: Arc<HttpClient>,
        base_url: Url,
        env: Arc<EnvironmentConfig>,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            base_url,
            env,
            credential,
        }
    }

    /// Parse the API base URL. A trailing slash is added so endpoint paths
    /// are joined under it rather than replacing its last segment.
    pub fn parse_base_url(base: &str) -> Result<Url, url::ParseError> {
        if base.ends_with('/') {
            Url::parse(base)
        } else {
            Url::parse(&format!("{}/", base))
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn auth_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(self.credential.as_str())
            .map_err(|_| ApiError::InvalidCredential)?;
        headers.insert(API_TOKEN_HEADER, value);
        Ok(headers)
    }

    fn status_request<'a>(&'a self, params: &'a PortalParameters) -> StatusCheckRequest<'a> {
        StatusCheckRequest {
            vlan: params.get_or(PortalKey::Port, &self.env.vlan),
            mac_address: params.get_or(PortalKey::Ma, &self.env.mac_address),
            ip_address: params.get_or(PortalKey::Sip, &self.env.ip_address),
            nseid: params.get_or(PortalKey::Ui, &self.env.nseid),
        }
    }

    fn pin_request(&self, property_id: u32) -> PinCheckRequest<'_> {
        PinCheckRequest {
            property_id,
            lastname: &self.env.last_name,
            roomnumber: &self.env.room_number,
        }
    }

    fn registration_request<'a>(
        &'a self,
        params: &'a PortalParameters,
        property_id: u32,
        vlan_id: u32,
    ) -> RegistrationRequest<'a> {
        RegistrationRequest {
            nseid: params.get_or(PortalKey::Ui, &self.env.nseid),
            property_id,
            vlan_id,
            mac_address: params.get_or(PortalKey::Ma, &self.env.mac_address),
            ip_address: params.get_or(PortalKey::Sip, &self.env.ip_address),
            registration_method_id: self.env.registration_method_id,
            rateplan_id: self.env.rate_plan_id,
            last_name: &self.env.last_name,
            room_number: &self.env.room_number,
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let headers = self.auth_headers()?;

        let resp = self
            .client
            .post_json_with_headers(url.as_str(), body, headers)
            .await?;
        let status = resp.status();
        let text = resp.text().await?;

        tracing::debug!(url = %url, status = status.as_u16(), "API response received");
        decode_response(status, &text)
    }
}

/// Turn a raw response into `R`; any non-2xx status is an error
fn decode_response<R: DeserializeOwned>(status: StatusCode, body: &str) -> Result<R, ApiError> {
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: truncate(body),
        });
    }

    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        source,
        body: truncate(body),
    })
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait]
impl RegistrationApi for SkyAdminClient {
    async fn check_registration_status(
        &self,
        params: &PortalParameters,
    ) -> Result<PortalRegistrationStatus, ApiError> {
        let payload = self.status_request(params);
        tracing::debug!(?payload, "Checking portal registration");

        let resp: Envelope<PortalRegistrationStatus> =
            self.post(STATUS_ENDPOINT, &payload).await?;
        Ok(resp.data)
    }

    async fn check_pin_requirement(&self, property_id: u32) -> Result<bool, ApiError> {
        let payload = self.pin_request(property_id);
        tracing::debug!(?payload, "Checking if PIN is required");

        let resp: Envelope<PinRequirement> = self.post(PIN_ENDPOINT, &payload).await?;
        Ok(resp.data.pin_required)
    }

    async fn register_device(
        &self,
        params: &PortalParameters,
        property_id: u32,
        vlan_id: u32,
    ) -> Result<RegistrationOutcome, ApiError> {
        let payload = self.registration_request(params, property_id, vlan_id);
        tracing::debug!(?payload, "Attempting registration");

        self.post(REGISTRATION_ENDPOINT, &payload).await
    }
}

/// Finds the API token in the splash page's app bundle, falling back to
/// the page body itself.
pub struct PortalTokenSource {
    client: Arc<HttpClient>,
}

impl PortalTokenSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    async fn token_from_script(&self, landing: &PortalLanding) -> Result<String> {
        let path = parser::extract_script_path(&landing.body);
        if path.is_empty() {
            bail!("no /js/ script referenced by the splash page");
        }

        let script_url = landing
            .url
            .join(&path)
            .with_context(|| format!("Invalid script path {}", path))?;
        tracing::debug!(url = %script_url, "Fetching portal script");

        let resp = self.client.get(script_url.as_str()).await?;
        if !resp.status().is_success() {
            bail!("script fetch returned {}", resp.status());
        }
        let script = resp.text().await.context("Failed to read portal script")?;

        Ok(parser::extract_api_token(&script))
    }
}

#[async_trait]
impl TokenSource for PortalTokenSource {
    async fn refresh_token(&self, landing: &PortalLanding) -> String {
        match self.token_from_script(landing).await {
            Ok(token) if !token.is_empty() => {
                tracing::debug!("Found API token in portal script");
                return token;
            }
            Ok(_) => tracing::debug!("No API token found in portal script"),
            Err(e) => tracing::debug!("Portal script unavailable: {:#}", e),
        }

        let token = parser::extract_api_token(&landing.body);
        if token.is_empty() {
            tracing::warn!("No API token found in captive portal response");
        } else {
            tracing::debug!("Found API token in captive portal response body");
        }
        token
    }
}
