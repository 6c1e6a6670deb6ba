// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for a remote verification service.
//!
//! Lets a [`super::GateController`] run against the server's `/v1/auth/*`
//! endpoints instead of an in-process [`super::VerificationService`]. The
//! wallet is identified by the session token.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::status::StatusView;
use super::{GateError, StatusSource, VerifyOutcome};
use crate::biometrics::{BiometricError, BiometricSample};
use crate::models::{FaceReverifyRequest, FaceVerifyRequest, PasswordRequest};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    similarity: Option<f64>,
}

pub struct StatusClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl StatusClient {
    /// `base_url` is the server root, e.g. `https://vault.example.com/`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, GateError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GateError::Transport(format!("invalid base URL: {e}")))?;
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GateError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| GateError::Transport(format!("invalid path {path}: {e}")))?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GateError> {
        let response = request
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;
        parse_response(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GateError> {
        let request = self.request(Method::POST, path)?.json(body);
        self.send(request).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, GateError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| GateError::Transport(format!("invalid response body: {e}")));
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            similarity: Some(score),
            ..
        }) => return Err(BiometricError::SimilarityBelowThreshold { score }.into()),
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    tracing::warn!(status = status.as_u16(), %message, "Verification service request failed");
    Err(GateError::Remote {
        status: status.as_u16(),
        message,
    })
}

impl StatusSource for StatusClient {
    async fn fetch_status(&self) -> Result<StatusView, GateError> {
        let request = self.request(Method::GET, "v1/auth/status")?;
        self.send(request).await
    }

    async fn face_verify(&self, sample: &BiometricSample) -> Result<VerifyOutcome, GateError> {
        let body = FaceVerifyRequest {
            face_embedding: sample.embedding.as_slice().to_vec(),
            liveness_score: sample.liveness_score,
        };
        self.post("v1/auth/face-verify", &body).await
    }

    async fn face_reverify(&self, sample: &BiometricSample) -> Result<VerifyOutcome, GateError> {
        let body = FaceReverifyRequest {
            current_face_embedding: sample.embedding.as_slice().to_vec(),
            new_face_embedding: None,
            liveness_score: sample.liveness_score,
        };
        self.post("v1/auth/face-reverify", &body).await
    }

    async fn set_password(&self, password: &str) -> Result<StatusView, GateError> {
        let body = PasswordRequest {
            password: password.to_string(),
        };
        self.post("v1/auth/set-password", &body).await
    }

    async fn reset_password(&self, password: &str) -> Result<StatusView, GateError> {
        let body = PasswordRequest {
            password: password.to_string(),
        };
        self.post("v1/auth/reset-password", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            StatusClient::new("not a url", "token"),
            Err(GateError::Transport(_))
        ));
    }

    #[test]
    fn joins_paths_under_base() {
        let client = StatusClient::new("https://vault.example.com/", "token").unwrap();
        let request = client
            .request(Method::GET, "v1/auth/status")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "https://vault.example.com/v1/auth/status");
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer token"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let client = StatusClient::new("http://127.0.0.1:9/", "token").unwrap();
        assert!(matches!(
            client.fetch_status().await,
            Err(GateError::Transport(_))
        ));
    }
}
