use std::time::Duration;

use jobwatch_core::{Job, JobId};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Scheme, host and port of the job service, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Collection path for job resources.
    pub jobs_path: String,
    /// Path that, suffixed with a job id, starts remote processing.
    pub start_path: String,
    pub bearer_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            jobs_path: "/api/v1/projects".to_string(),
            start_path: "/api/v1/lipsync/process".to_string(),
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Remote job service as seen by the engine.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn get_job(&self, job_id: JobId) -> Result<Job, ApiError>;

    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError>;

    /// Triggers remote processing. No retries are attempted here.
    async fn start_job(&self, job_id: JobId) -> Result<(), ApiError>;

    async fn delete_job(&self, job_id: JobId) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestJobApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn url(&self, path: &str, suffix: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_matches('/'),
            suffix
        );
        Url::parse(&raw).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn job_url(&self, job_id: JobId) -> Result<Url, ApiError> {
        self.url(&self.settings.jobs_path, &job_id.to_string())
    }

    async fn send(&self, method: Method, url: Url) -> Result<reqwest::Response, ApiError> {
        let mut request = self.client.request(method, url);
        if let Some(token) = self.settings.bearer_token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::new(FailureKind::NotFound, status.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn get_job(&self, job_id: JobId) -> Result<Job, ApiError> {
        let response = self.send(Method::GET, self.job_url(job_id)?).await?;
        response.json::<Job>().await.map_err(map_reqwest_error)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        // The collection route is registered with a trailing slash.
        let url = self.url(&self.settings.jobs_path, "")?;
        let response = self.send(Method::GET, url).await?;
        response.json::<Vec<Job>>().await.map_err(map_reqwest_error)
    }

    async fn start_job(&self, job_id: JobId) -> Result<(), ApiError> {
        let url = self.url(&self.settings.start_path, &job_id.to_string())?;
        self.send(Method::POST, url).await.map(|_| ())
    }

    async fn delete_job(&self, job_id: JobId) -> Result<(), ApiError> {
        self.send(Method::DELETE, self.job_url(job_id)?)
            .await
            .map(|_| ())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
