// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Generation Service.
//!
//! Implements [`GenerationBackend`] over the service's JSON job API:
//! submit returns a job id, status is polled, results are fetched
//! separately. The client holds an ordered endpoint list; on a transient
//! failure (connect error, 429, or any 5xx) it advances to the next
//! endpoint and retries the request, giving up once the list is exhausted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use styleforge_config::model::GenerationConfig;
use styleforge_core::{
    GenerationBackend, GenerationRequest, ImageRef, JobId, JobStatus, StyleforgeError,
};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    prompt: &'a str,
    styles: &'a [styleforge_core::StyleRef],
    image_size: &'a str,
    steps: u32,
    guidance_scale: f64,
    image_count: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    images: Vec<ImageRef>,
}

/// HTTP client for Generation Service communication.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl GenerationClient {
    /// Creates a client from the generation configuration.
    pub fn new(config: &GenerationConfig) -> Result<Self, StyleforgeError> {
        if config.endpoints.is_empty() {
            return Err(StyleforgeError::Config(
                "generation.endpoints must not be empty".into(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StyleforgeError::Generation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
        })
    }

    /// Overrides the endpoint list (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Run `send` against each endpoint in order until one yields a
    /// non-transient outcome.
    ///
    /// Transient = the request could not be sent, or the service answered
    /// 429 or 5xx. Anything else (success or a 4xx rejection) settles the
    /// call immediately.
    async fn with_failover<T, F, Fut>(&self, what: &str, send: F) -> Result<T, StyleforgeError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>> + Send,
        T: for<'de> Deserialize<'de>,
    {
        let mut last_error = String::new();

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if index > 0 {
                warn!(what, endpoint, index, "failing over to alternate endpoint");
            }

            let response = match send(endpoint.clone()).await {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("{what}: request to {endpoint} failed: {e}");
                    debug!(what, endpoint, error = %e, "transient transport error");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.json::<T>().await.map_err(|e| {
                    StyleforgeError::Generation {
                        message: format!("{what}: malformed response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = format!("{what}: {endpoint} returned {status}: {body}");
                debug!(what, endpoint, status = %status, "transient status, trying next endpoint");
                continue;
            }

            // Non-transient rejection: do not try other endpoints.
            return Err(StyleforgeError::generation(format!(
                "{what}: service returned {status}: {body}"
            )));
        }

        Err(StyleforgeError::generation(format!(
            "all endpoints failed; last error: {last_error}"
        )))
    }
}

#[async_trait]
impl GenerationBackend for GenerationClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, StyleforgeError> {
        let body = SubmitBody {
            prompt: &request.prompt,
            styles: &request.style_refs,
            image_size: &request.params.image_size,
            steps: request.params.steps,
            guidance_scale: request.params.guidance_scale,
            image_count: request.params.image_count,
        };
        let body = serde_json::to_value(&body).map_err(|e| StyleforgeError::Generation {
            message: format!("failed to encode submit body: {e}"),
            source: Some(Box::new(e)),
        })?;

        let response: SubmitResponse = self
            .with_failover("submit", |endpoint: String| {
                self.client
                    .post(format!("{endpoint}/v1/jobs"))
                    .json(&body)
                    .send()
            })
            .await?;

        debug!(job_id = %response.job_id, styles = request.style_refs.len(), "job submitted");
        Ok(JobId(response.job_id))
    }

    async fn poll_status(&self, job: &JobId) -> Result<JobStatus, StyleforgeError> {
        let job_id = job.0.clone();
        let response: StatusResponse = self
            .with_failover("poll", |endpoint: String| {
                self.client
                    .get(format!("{endpoint}/v1/jobs/{job_id}"))
                    .send()
            })
            .await?;

        match response.status.as_str() {
            "queued" => Ok(JobStatus::Queued),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed(
                response.error.unwrap_or_else(|| "unspecified".to_string()),
            )),
            other => Err(StyleforgeError::generation(format!(
                "poll: unknown job status `{other}`"
            ))),
        }
    }

    async fn fetch_result(&self, job: &JobId) -> Result<Vec<ImageRef>, StyleforgeError> {
        let job_id = job.0.clone();
        let response: ResultResponse = self
            .with_failover("fetch", |endpoint: String| {
                self.client
                    .get(format!("{endpoint}/v1/jobs/{job_id}/result"))
                    .send()
            })
            .await?;
        Ok(response.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use styleforge_core::{ImageParams, StyleRef};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a fox in watercolor".into(),
            style_refs: vec![StyleRef {
                asset: "watercolor.safetensors".into(),
                weight: 0.8,
            }],
            params: ImageParams {
                image_size: "1024x1024".into(),
                steps: 30,
                guidance_scale: 7.0,
                image_count: 1,
            },
        }
    }

    fn client_for(endpoints: Vec<String>) -> GenerationClient {
        GenerationClient::new(&GenerationConfig::default())
            .unwrap()
            .with_endpoints(endpoints)
    }

    #[tokio::test]
    async fn submit_parses_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "j-1"})),
            )
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let job = client.submit(&request()).await.unwrap();
        assert_eq!(job, JobId("j-1".into()));
    }

    #[tokio::test]
    async fn submit_fails_over_to_second_endpoint_on_503() {
        let primary = MockServer::start().await;
        let backup = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "j-2"})),
            )
            .mount(&backup)
            .await;

        let client = client_for(vec![primary.uri(), backup.uri()]);
        let job = client.submit(&request()).await.unwrap();
        assert_eq!(job, JobId("j-2".into()));
    }

    #[tokio::test]
    async fn non_transient_rejection_does_not_fail_over() {
        let primary = MockServer::start().await;
        let backup = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad prompt"))
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "nope"})),
            )
            .expect(0)
            .mount(&backup)
            .await;

        let client = client_for(vec![primary.uri(), backup.uri()]);
        let err = client.submit(&request()).await.unwrap_err();
        assert!(err.to_string().contains("bad prompt"));
    }

    #[tokio::test]
    async fn exhausted_endpoints_return_last_error() {
        let only = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&only)
            .await;

        let client = client_for(vec![only.uri()]);
        let err = client.submit(&request()).await.unwrap_err();
        assert!(err.to_string().contains("all endpoints failed"));
    }

    #[tokio::test]
    async fn poll_maps_every_status_string() {
        let server = MockServer::start().await;
        for (body, expected) in [
            (serde_json::json!({"status": "queued"}), JobStatus::Queued),
            (
                serde_json::json!({"status": "in_progress"}),
                JobStatus::InProgress,
            ),
            (
                serde_json::json!({"status": "completed"}),
                JobStatus::Completed,
            ),
            (
                serde_json::json!({"status": "failed", "error": "NSFW"}),
                JobStatus::Failed("NSFW".into()),
            ),
        ] {
            server.reset().await;
            Mock::given(method("GET"))
                .and(path("/v1/jobs/j-9"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let client = client_for(vec![server.uri()]);
            let status = client.poll_status(&JobId("j-9".into())).await.unwrap();
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn mid_poll_outage_surfaces_as_error_not_panic() {
        // Endpoint that no longer answers: connection refused. An unpooled
        // server is required here: pooled `MockServer::start` handles keep
        // listening after drop.
        let server = MockServer::builder().start().await;
        let uri = server.uri();
        drop(server);

        let client = client_for(vec![uri]);
        let err = client.poll_status(&JobId("j-9".into())).await.unwrap_err();
        assert!(err.to_string().contains("all endpoints failed"));
    }

    #[tokio::test]
    async fn fetch_result_parses_images() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/j-3/result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "images": [
                    {"url": "https://img.test/1.png", "seed": 42},
                    {"url": "https://img.test/2.png", "seed": null}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let images = client.fetch_result(&JobId("j-3".into())).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].seed, Some(42));
        assert_eq!(images[1].seed, None);
    }
}
