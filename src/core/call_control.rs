//! Call-control collaborator.
//!
//! The bridge only ever needs to hang up a call. [`VobizCallControl`] does that
//! through the provider's REST API:
//!
//! `DELETE {api_url}/Account/{auth_id}/Call/{call_id}/`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroize;

/// Default base URL of the Vobiz REST API.
pub const VOBIZ_API_URL: &str = "https://api.vobiz.ai/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CallControlError {
    #[error("Call control is not configured")]
    NotConfigured,

    #[error("Call control request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Call control request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Terminates calls on the telephony provider.
#[async_trait]
pub trait CallControl: Send + Sync {
    async fn terminate_call(&self, call_id: &str) -> Result<(), CallControlError>;
}

/// REST client for the Vobiz call API.
pub struct VobizCallControl {
    client: Client,
    api_url: String,
    auth_id: String,
    auth_token: String,
}

impl VobizCallControl {
    pub fn new(
        api_url: impl Into<String>,
        auth_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, CallControlError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth_id: auth_id.into(),
            auth_token: auth_token.into(),
        })
    }

    fn call_url(&self, call_id: &str) -> String {
        format!("{}/Account/{}/Call/{}/", self.api_url, self.auth_id, call_id)
    }
}

impl Drop for VobizCallControl {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

#[async_trait]
impl CallControl for VobizCallControl {
    async fn terminate_call(&self, call_id: &str) -> Result<(), CallControlError> {
        let response = self
            .client
            .delete(self.call_url(call_id))
            .header("X-Auth-ID", &self.auth_id)
            .header("X-Auth-Token", &self.auth_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(call_id, status = status.as_u16(), "Call termination rejected");
            return Err(CallControlError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(call_id, "Call terminated");
        Ok(())
    }
}

/// Stand-in used when no provider credentials are configured.
#[derive(Debug, Default)]
pub struct UnconfiguredCallControl;

#[async_trait]
impl CallControl for UnconfiguredCallControl {
    async fn terminate_call(&self, call_id: &str) -> Result<(), CallControlError> {
        warn!(call_id, "Cannot terminate call: call control credentials missing");
        Err(CallControlError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_terminate_call_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/Account/MA123/Call/abc123/"))
            .and(header("X-Auth-ID", "MA123"))
            .and(header("X-Auth-Token", "secret"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let control = VobizCallControl::new(server.uri(), "MA123", "secret").unwrap();
        control.terminate_call("abc123").await.unwrap();
    }

    #[tokio::test]
    async fn test_terminate_call_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("call not found"))
            .mount(&server)
            .await;

        let control =
            VobizCallControl::new(format!("{}/", server.uri()), "MA123", "secret").unwrap();
        let err = control.terminate_call("missing").await.unwrap_err();
        match err {
            CallControlError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "call not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_call_url_trims_trailing_slash() {
        let control = VobizCallControl::new("https://api.example.com/v1/", "A", "T").unwrap();
        assert_eq!(
            control.call_url("c1"),
            "https://api.example.com/v1/Account/A/Call/c1/"
        );
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let err = UnconfiguredCallControl.terminate_call("c").await.unwrap_err();
        assert!(matches!(err, CallControlError::NotConfigured));
    }
}
