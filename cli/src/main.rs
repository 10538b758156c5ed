use clap::Parser;
use color_eyre::Result;
use engine::pipeline;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    init_logger();

    let cfg = cli::Cli::parse().into_config()?;
    let saved = pipeline::run(&cfg).await?;

    println!(
        "Saved image for task {} to {} ({} bytes, seed {})",
        saved.task_id,
        saved.path.display(),
        saved.bytes,
        saved.seed
    );
    Ok(())
}

/// Info by default; RUST_LOG still wins.
fn init_logger() {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
