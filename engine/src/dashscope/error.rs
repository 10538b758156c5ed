use thiserror::Error;

use super::TaskStatus;

/// Errors returned by the DashScope task API
#[derive(Debug, Error)]
pub enum DashScopeError {
    #[error("Invalid request parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Authentication error: {message}")]
    InvalidApiKey { message: String },

    #[error("Request throttled: {message}")]
    Throttling { message: String },

    #[error("DashScope internal error: {message}")]
    Internal { message: String },

    /// Catch-all for error codes the client does not recognize
    #[error("Unexpected API error {code}: {message}")]
    Unexpected { code: String, message: String },

    /// The creation response carried a task id in neither known location.
    #[error("Creation response carried no task id: {body}")]
    MissingTaskId { body: String },

    /// The task reached the FAILED terminal state.
    #[error("Task {task_id} failed ({code}): {message}")]
    TaskFailed {
        task_id: String,
        code: String,
        message: String,
    },

    /// The poll budget ran out before the task reached a terminal state.
    #[error("Task {task_id} not finished after {attempts} polls (last status {last_status})")]
    Timeout {
        task_id: String,
        attempts: u32,
        last_status: TaskStatus,
    },
}

impl DashScopeError {
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        match code {
            "InvalidParameter" => Self::InvalidParameter { message },
            "InvalidApiKey" => Self::InvalidApiKey { message },
            "Throttling" | "Throttling.RateQuota" | "Throttling.AllocationQuota" => {
                Self::Throttling { message }
            }
            "InternalError" => Self::Internal { message },
            other => Self::Unexpected {
                code: other.to_string(),
                message,
            },
        }
    }
}
