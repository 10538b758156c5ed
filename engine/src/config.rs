use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use color_eyre::{Result, eyre::eyre};
use thiserror::Error;

/// Environment variable holding the DashScope API key.
pub const API_KEY_VAR: &str = "DASHSCOPE_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_MODEL: &str = "flux-merged";
pub const DEFAULT_PROMPT: &str =
    "A cute cat sitting on a windowsill, soft sunlight, digital art";
pub const DEFAULT_STEPS: u32 = 4;
pub const DEFAULT_OUTPUT_PATH: &str = "assets/generated_images/test_image.png";

/// Everything one synthesis run needs, resolved up front so the pipeline
/// itself never touches the process environment.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub prompt: String,
    pub size: ImageSize,
    /// `None` draws a fresh seed for this run.
    pub seed: Option<u32>,
    pub steps: u32,
    pub output_path: PathBuf,
    pub poll: PollPolicy,
}

impl GenerationConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            size: ImageSize::default(),
            seed: None,
            steps: DEFAULT_STEPS,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            poll: PollPolicy::default(),
        }
    }
}

/// Reads the API key from an explicit override or the process environment.
pub fn resolve_api_key(explicit: Option<String>) -> Result<String> {
    pick_api_key(explicit, env::var(API_KEY_VAR).ok())
}

pub fn pick_api_key(explicit: Option<String>, env_value: Option<String>) -> Result<String> {
    explicit
        .or(env_value)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| eyre!("{API_KEY_VAR} is not set; export it or pass --api-key"))
}

/// Output resolution, serialized on the wire as `width*height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

#[derive(Debug, Error)]
#[error("invalid image size {0:?}, expected WIDTH*HEIGHT")]
pub struct ParseSizeError(String);

impl FromStr for ImageSize {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseSizeError(s.to_string());
        let (width, height) = s.split_once('*').ok_or_else(bad)?;
        Ok(Self {
            width: width.parse().map_err(|_| bad())?,
            height: height.parse().map_err(|_| bad())?,
        })
    }
}

/// How long and how often to poll a task before giving up.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}
