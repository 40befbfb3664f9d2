//! Connectivity probe
//!
//! Requests a canary URL that answers `success\n` when the device has real
//! internet access. A captive gateway intercepts the request and redirects
//! it to its splash page instead, whose URL carries the portal parameters.

use crate::error::ProbeError;
use crate::http::HttpClient;
use crate::models::PortalParameters;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use url::Url;

pub const PROBE_URL: &str = "http://detectportal.firefox.com/success.txt?ipv4";
pub const PORTAL_HOST: &str = "splash.skyadmin.io";

const ONLINE_BODY: &str = "success\n";

/// Splash page the probe was redirected to
#[derive(Debug, Clone)]
pub struct PortalLanding {
    /// Final URL after redirects
    pub url: Url,
    pub params: PortalParameters,
    /// Page body, scanned later for the API token
    pub body: String,
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// `Ok(None)` when the device is online, the landing page when a
    /// captive portal intercepted the request.
    async fn probe(&self) -> Result<Option<PortalLanding>, ProbeError>;
}

pub struct HttpProbe {
    client: Arc<HttpClient>,
    probe_url: String,
    portal_host: String,
}

impl HttpProbe {
    pub fn new(
        client: Arc<HttpClient>,
        probe_url: impl Into<String>,
        portal_host: impl Into<String>,
    ) -> Self {
        Self {
            client,
            probe_url: probe_url.into(),
            portal_host: portal_host.into(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> Result<Option<PortalLanding>, ProbeError> {
        tracing::debug!(url = %self.probe_url, "Checking device status");

        let resp = self.client.get(&self.probe_url).await?;
        let status = resp.status();
        let final_url = resp.url().clone();
        let body = resp.text().await?;

        interpret_probe_response(status, final_url, body, &self.portal_host)
    }
}

/// Decide between online, captive portal, and unexpected redirect
pub fn interpret_probe_response(
    status: StatusCode,
    final_url: Url,
    body: String,
    portal_host: &str,
) -> Result<Option<PortalLanding>, ProbeError> {
    if status == StatusCode::OK && body == ONLINE_BODY {
        tracing::info!("Device is online and responding correctly");
        return Ok(None);
    }

    let host = final_url.host_str().unwrap_or_default();
    if host != portal_host {
        tracing::warn!(host, "Unexpected captive portal domain");
        return Err(ProbeError::UnexpectedDomain {
            host: host.to_string(),
        });
    }

    tracing::warn!(status = status.as_u16(), url = %final_url, "Captive portal detected");

    let params = PortalParameters::parse(final_url.as_str())?;
    Ok(Some(PortalLanding {
        url: final_url,
        params,
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PortalKey;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_online() {
        let result = interpret_probe_response(
            StatusCode::OK,
            url(PROBE_URL),
            "success\n".to_string(),
            PORTAL_HOST,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_portal_detected() {
        let landing = interpret_probe_response(
            StatusCode::OK,
            url("https://splash.skyadmin.io/?UI=a39d49&MA=D4CA6DA65E0E&PORT=3300&SIP=10.0.24.21&X=1"),
            "<html></html>".to_string(),
            PORTAL_HOST,
        )
        .unwrap()
        .expect("portal should be detected");

        assert_eq!(landing.params.len(), 4);
        assert_eq!(landing.params.get(PortalKey::Ui), Some("a39d49"));
        assert_eq!(landing.params.get(PortalKey::Sip), Some("10.0.24.21"));
        assert_eq!(landing.body, "<html></html>");
    }

    #[test]
    fn test_success_body_without_newline_is_not_online() {
        let result = interpret_probe_response(
            StatusCode::OK,
            url("https://splash.skyadmin.io/?PORT=1"),
            "success".to_string(),
            PORTAL_HOST,
        )
        .unwrap();
        assert!(result.is_some());
    }

    #[test]
    fn test_non_200_is_not_online() {
        let err = interpret_probe_response(
            StatusCode::SERVICE_UNAVAILABLE,
            url(PROBE_URL),
            "success\n".to_string(),
            PORTAL_HOST,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedDomain { ref host } if host == "detectportal.firefox.com"));
    }

    #[test]
    fn test_unexpected_domain() {
        let err = interpret_probe_response(
            StatusCode::OK,
            url("http://login.hotel-wifi.example/?UI=a39d49"),
            "<html></html>".to_string(),
            PORTAL_HOST,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedDomain { ref host } if host == "login.hotel-wifi.example"));
    }

    #[test]
    fn test_subdomain_is_not_portal_host() {
        let err = interpret_probe_response(
            StatusCode::OK,
            url("https://evil.splash.skyadmin.io/?UI=a39d49"),
            String::new(),
            PORTAL_HOST,
        )
        .unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedDomain { .. }));
    }
}
