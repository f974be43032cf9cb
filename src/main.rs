use tracing::info;
use tracing_subscriber::EnvFilter;

use camera_profiling::{CameraPipeline, PipelineConfig, NAME, VERSION};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load_from_file(&path)?,
        None => PipelineConfig::default(),
    };
    info!("{} v{}", NAME, VERSION);
    info!("Pipeline config: {}", serde_json::to_string(&config)?);

    let pipeline = CameraPipeline::new(config);
    pipeline.run().await?;

    info!("Simulation finished");
    Ok(())
}
