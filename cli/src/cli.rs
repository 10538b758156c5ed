use std::{path::PathBuf, time::Duration};

use color_eyre::Result;
use engine::config::{GenerationConfig, ImageSize, resolve_api_key};
use indoc::indoc;

/// Submits a text-to-image task to DashScope, waits for it to finish, and
/// saves the resulting image.
#[derive(Debug, clap::Parser)]
#[command(after_help = indoc! {"
    Environment:
      DASHSCOPE_API_KEY  API key used when --api-key is not given.

    A .env file in the working directory is loaded before flags are resolved.
"})]
pub struct Cli {
    /// Text prompt to render.
    pub prompt: Option<String>,

    /// API key; falls back to DASHSCOPE_API_KEY.
    #[arg(short, long)]
    pub api_key: Option<String>,

    /// Base URL of the DashScope API.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model that renders the image.
    #[arg(short, long)]
    pub model: Option<String>,

    /// Image size as WIDTH*HEIGHT.
    #[arg(short, long)]
    pub size: Option<ImageSize>,

    /// Seed for reproducible runs; drawn randomly from 0..10000 when absent.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Number of denoising steps.
    #[arg(long)]
    pub steps: Option<u32>,

    /// Where to write the image.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Milliseconds to sleep before each status poll.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// How many status polls to make before giving up.
    #[arg(long)]
    pub max_polls: Option<u32>,
}

impl Cli {
    /// Resolves the flags against the built-in defaults and the environment.
    pub fn into_config(self) -> Result<GenerationConfig> {
        let api_key = resolve_api_key(self.api_key)?;
        let mut cfg = GenerationConfig::new(api_key);

        if let Some(base_url) = self.base_url {
            cfg.base_url = base_url;
        }
        if let Some(model) = self.model {
            cfg.model = model;
        }
        if let Some(prompt) = self.prompt {
            cfg.prompt = prompt;
        }
        if let Some(size) = self.size {
            cfg.size = size;
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(steps) = self.steps {
            cfg.steps = steps;
        }
        if let Some(output) = self.output {
            cfg.output_path = output;
        }
        if let Some(ms) = self.poll_interval_ms {
            cfg.poll.interval = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_polls {
            cfg.poll.max_attempts = max;
        }
        Ok(cfg)
    }
}
