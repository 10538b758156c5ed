//! Client for the DashScope asynchronous text-to-image API.
//!
//! Image synthesis runs as a server-side task: [`DashScope::submit`] creates
//! it, [`DashScope::wait_until_done`] polls it to a terminal state, and
//! [`DashScope::download`] fetches the finished image from its pre-signed
//! result URL.

use std::fmt;

use bytes::Bytes;
use color_eyre::{
    Result,
    eyre::{bail, ensure, eyre},
};
use log::{debug, info};
use nonempty::NonEmpty;
use rand::Rng;
use reqwest::Client;
use strum::EnumString;
use tokio::time::sleep;

use crate::config::{GenerationConfig, ImageSize, PollPolicy};

mod error;
pub mod wire;

pub use error::DashScopeError;

/// Header that switches the synthesis endpoint into task mode.
pub const ASYNC_HEADER: &str = "X-DashScope-Async";

/// One synthesis job. Fixed at construction, so retries and logs always see
/// the same parameters, in particular the same seed.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub model: String,
    pub prompt: String,
    pub size: ImageSize,
    pub seed: u32,
    pub steps: u32,
}

impl SynthesisRequest {
    /// Builds the request, drawing a random seed when the config leaves it
    /// open.
    pub fn from_config(cfg: &GenerationConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            prompt: cfg.prompt.clone(),
            size: cfg.size,
            seed: cfg
                .seed
                .unwrap_or_else(|| rand::rng().random_range(0..10_000)),
            steps: cfg.steps,
        }
    }
}

/// Opaque identifier DashScope hands out for a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical task state. `Succeeded` and `Failed` are terminal; everything
/// else means the task is still worth polling.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Suspended,
    Succeeded,
    Failed,
    Canceled,
    /// Any status string this client does not recognize, kept verbatim. A
    /// missing status becomes `Unknown("")` and displays as `-`.
    #[strum(default)]
    Unknown(String),
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Suspended => "SUSPENDED",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Unknown(raw) if raw.is_empty() => "-",
            TaskStatus::Unknown(raw) => raw,
        };
        f.write_str(label)
    }
}

/// One normalized status snapshot of a task.
#[derive(Debug, Clone)]
pub struct TaskPoll {
    pub status: TaskStatus,
    pub code: Option<String>,
    pub message: Option<String>,
    pub results: Vec<ImageResult>,
}

#[derive(Debug, Clone)]
pub struct ImageResult {
    pub url: Option<String>,
}

impl TaskPoll {
    /// Downloadable URLs of a succeeded task. The first entry must carry a
    /// URL; later entries without one are dropped.
    pub fn image_urls(&self) -> Result<NonEmpty<String>> {
        let first = self
            .results
            .first()
            .ok_or_else(|| eyre!("Task finished without image results"))?;
        let head = first
            .url
            .clone()
            .ok_or_else(|| eyre!("First image result carries no URL"))?;
        let tail = self.results[1..]
            .iter()
            .filter_map(|result| result.url.clone())
            .collect();
        Ok(NonEmpty { head, tail })
    }
}

/// Thin client over the DashScope synthesis endpoints.
#[derive(Clone)]
pub struct DashScope {
    api_key: String,
    base_url: String,
    client: Client,
}

impl DashScope {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(cfg: &GenerationConfig) -> Self {
        Self::new(cfg.api_key.clone(), &cfg.base_url)
    }

    /// Creates the asynchronous synthesis task and returns its handle.
    pub async fn submit(&self, request: &SynthesisRequest) -> Result<TaskId> {
        let resp = self
            .client
            .post(format!(
                "{}/services/aigc/text2image/image-synthesis",
                self.base_url
            ))
            .bearer_auth(&self.api_key)
            .header(ASYNC_HEADER, "enable")
            .json(&wire::SynthesisBody::new(request))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!("creation response ({status}): {body}");

        let parsed: wire::CreateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => {
                ensure!(status.is_success(), "DashScope returned {status}: {body}");
                return Err(DashScopeError::MissingTaskId { body }.into());
            }
        };
        if let Some(err) = parsed.error() {
            return Err(err.into());
        }
        ensure!(status.is_success(), "DashScope returned {status}: {body}");

        match parsed.task_id() {
            Some(id) => Ok(TaskId(id.to_string())),
            None => Err(DashScopeError::MissingTaskId { body }.into()),
        }
    }

    /// One authenticated status poll, normalized into a [`TaskPoll`].
    pub async fn task_status(&self, task: &TaskId) -> Result<TaskPoll> {
        let resp = self
            .client
            .get(format!("{}/tasks/{task}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!("poll response for {task} ({status}): {body}");

        let parsed: wire::StatusResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => bail!("Task poll returned {status} with a malformed body: {body}"),
        };
        if let Some(err) = parsed.error() {
            return Err(err.into());
        }
        ensure!(status.is_success(), "Task poll returned {status}: {body}");

        Ok(parsed.into_poll())
    }

    /// Polls until the task reaches a terminal state or the policy's attempt
    /// budget runs out. Sleeps before every poll, so the first status request
    /// happens one interval after submission.
    pub async fn wait_until_done(&self, task: &TaskId, policy: &PollPolicy) -> Result<TaskPoll> {
        let mut last_status = TaskStatus::Unknown(String::new());

        for attempt in 1..=policy.max_attempts {
            sleep(policy.interval).await;
            let poll = self.task_status(task).await?;

            match poll.status {
                TaskStatus::Succeeded => {
                    info!("task {task} succeeded after {attempt} polls");
                    return Ok(poll);
                }
                TaskStatus::Failed => {
                    return Err(DashScopeError::TaskFailed {
                        task_id: task.to_string(),
                        code: poll.code.unwrap_or_else(|| "unknown".into()),
                        message: poll.message.unwrap_or_else(|| "no details given".into()),
                    }
                    .into());
                }
                status => {
                    info!(
                        "task {task}: {status}, still waiting ({attempt}/{})",
                        policy.max_attempts
                    );
                    last_status = status;
                }
            }
        }

        Err(DashScopeError::Timeout {
            task_id: task.to_string(),
            attempts: policy.max_attempts,
            last_status,
        }
        .into())
    }

    /// Fetches the finished image into memory. Result URLs are pre-signed,
    /// so no auth header is attached.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?)
    }
}
