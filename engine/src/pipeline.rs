//! The submit / wait / download / save pipeline.

use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use log::{debug, info};

use crate::{
    config::GenerationConfig,
    dashscope::{DashScope, SynthesisRequest, TaskId},
};

/// What [`run`] leaves behind on success.
#[derive(Debug)]
pub struct SavedImage {
    pub task_id: TaskId,
    pub seed: u32,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Runs the whole pipeline against the given config. The output file is only
/// written after every earlier stage has succeeded, so a failed run never
/// leaves a partial image behind.
pub async fn run(cfg: &GenerationConfig) -> Result<SavedImage> {
    let client = DashScope::from_config(cfg);
    let request = SynthesisRequest::from_config(cfg);

    info!(
        "submitting text-to-image task: model {}, size {}, seed {}, {} steps",
        request.model, request.size, request.seed, request.steps
    );
    let task = client.submit(&request).await?;
    info!("task {task} accepted, waiting for completion");

    let done = client.wait_until_done(&task, &cfg.poll).await?;
    let urls = done.image_urls()?;
    if !urls.tail.is_empty() {
        debug!(
            "task {task} produced {} images, downloading only the first",
            urls.tail.len() + 1
        );
    }

    let body = client.download(urls.first()).await?;
    save_image(&cfg.output_path, &body)?;
    info!(
        "saved {} bytes to {}",
        body.len(),
        cfg.output_path.display()
    );

    Ok(SavedImage {
        task_id: task,
        seed: request.seed,
        path: cfg.output_path.clone(),
        bytes: body.len(),
    })
}

/// Writes the image, creating missing parent directories and overwriting any
/// previous file at the path.
pub fn save_image(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}
