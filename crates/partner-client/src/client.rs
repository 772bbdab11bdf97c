//! Partner API client
//!
//! reqwest-backed implementation of [`PartnerApi`]. Each client is bound to
//! one partner base URL and stamps every request with the caller identity
//! header.

use crate::error::PartnerError;
use crate::models::*;
use crate::multipart::EncodedForm;
use crate::partner_trait::PartnerApi;
use crate::response::PartnerResponse;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Header carrying the caller identity on every request
pub const CALLER_ID_HEADER: &str = "X-Client-ID";

/// Partner API client
#[derive(Debug, Clone)]
pub struct PartnerClient {
    client: Client,
    base_url: String,
    caller_id: String,
}

impl PartnerClient {
    /// Create a new partner client
    ///
    /// # Arguments
    /// * `base_url` - Partner API base URL (e.g., "https://partner:8443/operatorplatform/federation/v1")
    /// * `caller_id` - Value of the `X-Client-ID` header
    /// * `insecure_skip_verify` - Accept invalid TLS certificates
    pub fn new(
        base_url: impl Into<String>,
        caller_id: impl Into<String>,
        insecure_skip_verify: bool,
    ) -> Result<Self, PartnerError> {
        let base_url = base_url.into();
        let caller_id = caller_id.into();
        if base_url.trim().is_empty() {
            return Err(PartnerError::InvalidConfig("partner base URL is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&caller_id).map_err(|e| {
            PartnerError::InvalidConfig(format!("caller id is not a valid header value: {e}"))
        })?;
        headers.insert(CALLER_ID_HEADER, value);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            caller_id,
        })
    }

    /// Caller identity sent with every request
    #[must_use]
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    fn url(&self, segments: &[&str]) -> String {
        let path: Vec<_> = segments.iter().map(|s| urlencoding::encode(s)).collect();
        format!("{}/{}", self.base_url, path.join("/"))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<PartnerResponse<T>, PartnerError> {
        let (status, text) = self.execute(request, operation).await?;
        if !(200..300).contains(&status) {
            return Ok(failure(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(PartnerResponse::empty(status));
        }
        Ok(PartnerResponse::ok(status, serde_json::from_str(&text)?))
    }

    async fn send_empty(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        let (status, text) = self.execute(request, operation).await?;
        if (200..300).contains(&status) {
            Ok(PartnerResponse::ok(status, ()))
        } else {
            Ok(failure(status, &text))
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<(u16, String), PartnerError> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(operation, status, base_url = %self.base_url, "partner answered");
        Ok((status, text))
    }
}

fn failure<T>(status: u16, text: &str) -> PartnerResponse<T> {
    let problem = if text.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<ProblemDetails>(text) {
            Ok(problem) => Some(problem),
            Err(e) => {
                debug!(status, error = %e, "partner error body is not a problem document");
                Some(ProblemDetails::new(status, text.chars().take(500).collect::<String>()))
            }
        }
    };
    PartnerResponse {
        status,
        body: None,
        problem,
    }
}

#[async_trait::async_trait]
impl PartnerApi for PartnerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_federation(
        &self,
        request: &FederationRequestData,
    ) -> Result<PartnerResponse<FederationResponseData>, PartnerError> {
        let req = self.client.post(self.url(&["partner"])).json(request);
        self.send_json(req, "create_federation").await
    }

    async fn delete_federation(&self, context_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self.client.delete(self.url(&[context_id, "partner"]));
        self.send_empty(req, "delete_federation").await
    }

    async fn zone_subscribe(
        &self,
        context_id: &str,
        request: &ZoneRegistrationRequestData,
    ) -> Result<PartnerResponse<ZoneRegistrationResponseData>, PartnerError> {
        let req = self.client.post(self.url(&[context_id, "zones"])).json(request);
        self.send_json(req, "zone_subscribe").await
    }

    async fn upload_file(&self, context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self
            .client
            .post(self.url(&[context_id, "files"]))
            .header(CONTENT_TYPE, form.content_type)
            .body(form.body);
        self.send_empty(req, "upload_file").await
    }

    async fn remove_file(&self, context_id: &str, file_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self.client.delete(self.url(&[context_id, "files", file_id]));
        self.send_empty(req, "remove_file").await
    }

    async fn upload_artefact(&self, context_id: &str, form: EncodedForm) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self
            .client
            .post(self.url(&[context_id, "artefact"]))
            .header(CONTENT_TYPE, form.content_type)
            .body(form.body);
        self.send_empty(req, "upload_artefact").await
    }

    async fn remove_artefact(&self, context_id: &str, artefact_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self.client.delete(self.url(&[context_id, "artefact", artefact_id]));
        self.send_empty(req, "remove_artefact").await
    }

    async fn onboard_application(
        &self,
        context_id: &str,
        request: &OnboardApplicationRequest,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self
            .client
            .post(self.url(&[context_id, "application", "onboarding"]))
            .json(request);
        self.send_empty(req, "onboard_application").await
    }

    async fn delete_app(&self, context_id: &str, app_id: &str) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self
            .client
            .delete(self.url(&[context_id, "application", "onboarding", "app", app_id]));
        self.send_empty(req, "delete_app").await
    }

    async fn install_app(
        &self,
        context_id: &str,
        request: &InstallAppRequest,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self
            .client
            .post(self.url(&[context_id, "application", "lcm"]))
            .json(request);
        self.send_empty(req, "install_app").await
    }

    async fn remove_app(
        &self,
        context_id: &str,
        app_id: &str,
        app_instance_id: &str,
        zone_id: &str,
    ) -> Result<PartnerResponse<()>, PartnerError> {
        let req = self.client.delete(self.url(&[
            context_id, "application", "lcm", "app", app_id, "instance", app_instance_id, "zone", zone_id,
        ]));
        self.send_empty(req, "remove_app").await
    }

    async fn get_app_instance_details(
        &self,
        context_id: &str,
        app_id: &str,
        app_instance_id: &str,
        zone_id: &str,
    ) -> Result<PartnerResponse<AppInstanceDetails>, PartnerError> {
        let req = self.client.get(self.url(&[
            context_id, "application", "lcm", "app", app_id, "instance", app_instance_id, "zone", zone_id,
        ]));
        self.send_json(req, "get_app_instance_details").await
    }
}
