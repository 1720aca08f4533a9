//! HTTP Business Engine adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::{
    BusinessEngine, CreditBalance, EngineError, HealthReport, RemoteStatus, StatusReport,
    SubmissionReceipt, VendedToken,
};
use crate::domain::transcription::{ProcessingTier, VideoUrl};

/// User agent sent with every request
const USER_AGENT: &str = concat!("pluct-transcribe/", env!("CARGO_PKG_VERSION"));

// Request types for the Business Engine API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VendTokenRequest {
    client_request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeRequest {
    url: String,
    tier: String,
}

// Response types for the Business Engine API

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: Option<String>,
    healthy: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VendTokenResponse {
    token: String,
    scope: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    balance_after: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct RemoteStatusResponse {
    status: String,
    percent: Option<f64>,
    transcript: Option<String>,
    confidence: Option<f32>,
    language: Option<String>,
    error: Option<String>,
}

/// Business Engine client over HTTP.
///
/// Pure transport: classifies every failure as an [`EngineError`] and
/// never retries; retrying is the orchestrator's job. The correlation
/// id is fixed per client instance so one job's calls can be stitched
/// together server-side.
pub struct HttpBusinessEngine {
    base_url: String,
    client: reqwest::Client,
    correlation_id: String,
}

impl HttpBusinessEngine {
    /// Create a client for the given engine base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_common_headers(
        &self,
        request: reqwest::RequestBuilder,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let request = request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .header("X-Correlation-ID", &self.correlation_id);
        match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a transport-level failure onto the error taxonomy
    fn transport_error(err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout
        } else if err.is_connect() || err.is_request() {
            EngineError::Network(err.to_string())
        } else {
            EngineError::Unknown(err.to_string())
        }
    }

    /// Map a non-success HTTP status onto the error taxonomy
    fn classify_status(status: StatusCode, body: &str) -> EngineError {
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        };
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                EngineError::InvalidInput(message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EngineError::Auth(message),
            StatusCode::PAYMENT_REQUIRED => EngineError::InsufficientCredits,
            StatusCode::TOO_MANY_REQUESTS => EngineError::RateLimited,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => EngineError::Timeout,
            status if status.is_server_error() => EngineError::Server {
                status: status.as_u16(),
                message,
            },
            status => EngineError::Unknown(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Check the status and deserialize the body as `T`
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))
    }

    fn parse_remote_status(status: &str) -> Result<RemoteStatus, EngineError> {
        match status.to_ascii_lowercase().as_str() {
            "queued" | "pending" => Ok(RemoteStatus::Queued),
            "processing" | "running" => Ok(RemoteStatus::Processing),
            "completed" | "done" => Ok(RemoteStatus::Completed),
            "failed" | "error" => Ok(RemoteStatus::Failed),
            other => Err(EngineError::Unknown(format!(
                "unrecognized remote status '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl BusinessEngine for HttpBusinessEngine {
    async fn health(&self) -> Result<HealthReport, EngineError> {
        let request = self
            .apply_common_headers(self.client.get(self.endpoint("/health")), None);
        let response = request.send().await.map_err(Self::transport_error)?;
        let body: HealthResponse = Self::read_json(response).await?;

        let healthy = body.healthy.unwrap_or(false)
            || matches!(body.status.as_deref(), Some("ok") | Some("healthy"));
        Ok(HealthReport { healthy })
    }

    async fn credit_balance(&self, user_jwt: &str) -> Result<CreditBalance, EngineError> {
        let request = self.apply_common_headers(
            self.client.get(self.endpoint("/v1/credits/balance")),
            Some(user_jwt),
        );
        let response = request.send().await.map_err(Self::transport_error)?;
        let body: BalanceResponse = Self::read_json(response).await?;
        Ok(CreditBalance {
            balance: body.balance,
        })
    }

    async fn vend_token(
        &self,
        user_jwt: &str,
        client_request_id: &str,
    ) -> Result<VendedToken, EngineError> {
        let request = self
            .apply_common_headers(
                self.client.post(self.endpoint("/v1/vend-token")),
                Some(user_jwt),
            )
            .header("X-Client-Request-Id", client_request_id)
            .json(&VendTokenRequest {
                client_request_id: client_request_id.to_string(),
            });
        let response = request.send().await.map_err(Self::transport_error)?;
        let body: VendTokenResponse = Self::read_json(response).await?;
        Ok(VendedToken {
            token: body.token,
            scope: body.scope,
            expires_at: body.expires_at,
            balance_after: body.balance_after,
        })
    }

    async fn submit(
        &self,
        url: &VideoUrl,
        tier: ProcessingTier,
        token: &str,
    ) -> Result<SubmissionReceipt, EngineError> {
        let request = self
            .apply_common_headers(
                self.client.post(self.endpoint("/v1/transcribe")),
                Some(token),
            )
            .json(&TranscribeRequest {
                url: url.as_str().to_string(),
                tier: tier.wire_name().to_string(),
            });
        let response = request.send().await.map_err(Self::transport_error)?;
        let body: TranscribeResponse = Self::read_json(response).await?;
        Ok(SubmissionReceipt {
            request_id: body.request_id,
        })
    }

    async fn poll_status(
        &self,
        request_id: &str,
        token: &str,
    ) -> Result<StatusReport, EngineError> {
        let request = self.apply_common_headers(
            self.client
                .get(self.endpoint(&format!("/ttt/status/{}", request_id))),
            Some(token),
        );
        let response = request.send().await.map_err(Self::transport_error)?;
        let body: RemoteStatusResponse = Self::read_json(response).await?;

        Ok(StatusReport {
            status: Self::parse_remote_status(&body.status)?,
            percent: body.percent.map(|p| p.clamp(0.0, 100.0) as u8),
            transcript: body.transcript,
            confidence: body.confidence,
            language: body.language,
            error: body.error,
        })
    }
}
