//! Wire types for the DashScope task API.
//!
//! The service answers in two shapes: the interesting fields sit either
//! nested under an `output` object or at the top level of the response. The
//! accessors here resolve both shapes once, at ingress, preferring the
//! nested location, and hand the rest of the crate the canonical types from
//! [`crate::dashscope`].

use serde::{Deserialize, Serialize};

use super::{DashScopeError, ImageResult, SynthesisRequest, TaskPoll, TaskStatus};

/// Creation body: `{model, input: {prompt}, parameters: {size, seed, steps}}`.
#[derive(Debug, Serialize)]
pub struct SynthesisBody<'a> {
    model: &'a str,
    input: Input<'a>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Input<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct Parameters {
    size: String,
    seed: u32,
    steps: u32,
}

impl<'a> SynthesisBody<'a> {
    pub fn new(request: &'a SynthesisRequest) -> Self {
        Self {
            model: &request.model,
            input: Input {
                prompt: &request.prompt,
            },
            parameters: Parameters {
                size: request.size.to_string(),
                seed: request.seed,
                steps: request.steps,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateResponse {
    pub request_id: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub output: Option<CreateOutput>,
    pub task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOutput {
    pub task_id: Option<String>,
    pub task_status: Option<String>,
}

impl CreateResponse {
    /// Task id from either response shape, nested preferred. Empty strings
    /// count as missing, so a blank nested id falls through to the top level.
    pub fn task_id(&self) -> Option<&str> {
        self.output
            .as_ref()
            .and_then(|output| output.task_id.as_deref())
            .filter(|id| !id.is_empty())
            .or(self.task_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Structured error when the response carries an explicit code. The
    /// message falls back to the code itself when the service omits it.
    pub fn error(&self) -> Option<DashScopeError> {
        let code = self.code.as_deref()?;
        Some(DashScopeError::from_code(
            code,
            self.message.as_deref().unwrap_or(code),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub request_id: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub output: Option<StatusOutput>,
    pub task_status: Option<String>,
}

/// Failure details (`code`/`message`) and `results` only show up once the
/// task is terminal.
#[derive(Debug, Deserialize)]
pub struct StatusOutput {
    pub task_id: Option<String>,
    pub task_status: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub results: Option<Vec<ResultEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct ResultEntry {
    pub url: Option<String>,
}

impl StatusResponse {
    /// Status from either response shape, nested preferred. Absent or
    /// unrecognized values become [`TaskStatus::Unknown`].
    pub fn status(&self) -> TaskStatus {
        self.output
            .as_ref()
            .and_then(|output| output.task_status.as_deref())
            .or(self.task_status.as_deref())
            .map(|raw| {
                raw.parse()
                    .unwrap_or_else(|_| TaskStatus::Unknown(raw.to_string()))
            })
            .unwrap_or_else(|| TaskStatus::Unknown(String::new()))
    }

    /// Request-level error code, handled like [`CreateResponse::error`].
    pub fn error(&self) -> Option<DashScopeError> {
        let code = self.code.as_deref()?;
        Some(DashScopeError::from_code(
            code,
            self.message.as_deref().unwrap_or(code),
        ))
    }

    pub fn into_poll(self) -> TaskPoll {
        let status = self.status();
        let (code, message, results) = self
            .output
            .map(|output| {
                (
                    output.code,
                    output.message,
                    output.results.unwrap_or_default(),
                )
            })
            .unwrap_or_default();

        TaskPoll {
            status,
            code,
            message,
            results: results
                .into_iter()
                .map(|entry| ImageResult { url: entry.url })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::config::ImageSize;

    #[test]
    fn request_serialization() {
        let request = SynthesisRequest {
            model: "flux-merged".into(),
            prompt: "A cute cat sitting on a windowsill, soft sunlight, digital art".into(),
            size: ImageSize::default(),
            seed: 42,
            steps: 4,
        };

        let expect = expect![[
            r#"{"model":"flux-merged","input":{"prompt":"A cute cat sitting on a windowsill, soft sunlight, digital art"},"parameters":{"size":"1024*1024","seed":42,"steps":4}}"#
        ]];
        expect.assert_eq(&serde_json::to_string(&SynthesisBody::new(&request)).unwrap());
    }

    #[test]
    fn task_id_prefers_the_nested_location() {
        let parsed: CreateResponse = serde_json::from_str(
            r#"{"output":{"task_id":"nested"},"task_id":"top","request_id":"r1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.task_id(), Some("nested"));
    }

    #[test]
    fn task_id_falls_back_to_the_top_level() {
        let parsed: CreateResponse = serde_json::from_str(r#"{"task_id":"top"}"#).unwrap();
        assert_eq!(parsed.task_id(), Some("top"));
    }

    #[test]
    fn creation_without_task_id_yields_none() {
        let parsed: CreateResponse = serde_json::from_str(r#"{"request_id":"r1"}"#).unwrap();
        assert_eq!(parsed.task_id(), None);
    }

    #[test]
    fn empty_task_ids_count_as_missing() {
        let nested_empty: CreateResponse =
            serde_json::from_str(r#"{"output":{"task_id":""},"task_id":"top"}"#).unwrap();
        assert_eq!(nested_empty.task_id(), Some("top"));

        let only_empty: CreateResponse =
            serde_json::from_str(r#"{"output":{"task_id":""}}"#).unwrap();
        assert_eq!(only_empty.task_id(), None);

        let both_empty: CreateResponse =
            serde_json::from_str(r#"{"output":{"task_id":""},"task_id":""}"#).unwrap();
        assert_eq!(both_empty.task_id(), None);
    }

    #[test]
    fn creation_error_codes_become_structured_errors() {
        let parsed: CreateResponse =
            serde_json::from_str(r#"{"code":"InvalidParameter","message":"bad size"}"#).unwrap();
        let err = parsed.error().unwrap();
        assert!(
            matches!(err, DashScopeError::InvalidParameter { ref message } if message == "bad size")
        );
    }

    #[test]
    fn error_message_falls_back_to_the_code() {
        let parsed: CreateResponse = serde_json::from_str(r#"{"code":"Throttling"}"#).unwrap();
        assert_eq!(
            parsed.error().unwrap().to_string(),
            "Request throttled: Throttling"
        );
    }

    #[test]
    fn status_reads_both_shapes() {
        let nested: StatusResponse =
            serde_json::from_str(r#"{"output":{"task_status":"SUCCEEDED"}}"#).unwrap();
        assert_eq!(nested.status(), TaskStatus::Succeeded);

        let top: StatusResponse = serde_json::from_str(r#"{"task_status":"FAILED"}"#).unwrap();
        assert_eq!(top.status(), TaskStatus::Failed);
    }

    #[test]
    fn nested_status_wins_over_the_top_level() {
        let parsed: StatusResponse = serde_json::from_str(
            r#"{"output":{"task_status":"RUNNING"},"task_status":"PENDING"}"#,
        )
        .unwrap();
        assert_eq!(parsed.status(), TaskStatus::Running);
    }

    #[test]
    fn unrecognized_status_strings_are_preserved() {
        let parsed: StatusResponse =
            serde_json::from_str(r#"{"output":{"task_status":"THROTTLED"}}"#).unwrap();
        assert_eq!(parsed.status(), TaskStatus::Unknown("THROTTLED".into()));
    }

    #[test]
    fn missing_status_displays_as_a_dash() {
        let parsed: StatusResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.status().to_string(), "-");
    }

    #[test]
    fn into_poll_carries_failure_details() {
        let parsed: StatusResponse = serde_json::from_str(
            r#"{"output":{"task_status":"FAILED","code":"InternalError.Algo","message":"boom"}}"#,
        )
        .unwrap();
        let poll = parsed.into_poll();
        assert_eq!(poll.status, TaskStatus::Failed);
        assert_eq!(poll.code.as_deref(), Some("InternalError.Algo"));
        assert_eq!(poll.message.as_deref(), Some("boom"));
        assert!(poll.results.is_empty());
    }

    #[test]
    fn into_poll_keeps_result_entries_in_order() {
        let parsed: StatusResponse = serde_json::from_str(
            r#"{"output":{"task_status":"SUCCEEDED","results":[{"url":"a"},{},{"url":"b"}]}}"#,
        )
        .unwrap();
        let poll = parsed.into_poll();
        let urls: Vec<_> = poll.results.iter().map(|r| r.url.as_deref()).collect();
        assert_eq!(urls, vec![Some("a"), None, Some("b")]);
    }
}
