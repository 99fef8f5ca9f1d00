use anyhow::anyhow;
use crew_parallel_patterns::config::{ConfigManager, FileConfigManager};
use crew_parallel_patterns::llm::backend_from_config;
use crew_parallel_patterns::Patterns;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_manager = FileConfigManager::new(PathBuf::from("config.toml"));
    let config = config_manager
        .load_config()
        .await
        .map_err(|e| anyhow!("failed to load config.toml: {}", e))?;
    let llm = backend_from_config(&config.llm).map_err(|e| anyhow!("failed to set up the LLM backend: {}", e))?;
    let patterns = Patterns::new(llm, &config);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("plot") => {
            let dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            for path in patterns.plot_flows(&dir).map_err(|e| anyhow!("plotting failed: {}", e))? {
                println!("Wrote {}", path.display());
            }
        }
        Some(other) => return Err(anyhow!("unknown command '{}', expected 'plot [dir]'", other)),
        None => {
            tracing::info!("Running all patterns");
            patterns.run_all().await.map_err(|e| anyhow!("{}", e))?;
        }
    }

    Ok(())
}
