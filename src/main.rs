use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use top_verified_users::{logging, PipelineConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = PipelineConfig::parse();
    logging::init(&config.log_level);

    info!(
        posts = %config.input_posts_path,
        users = %config.input_users_path,
        output = %config.output_path,
        top_n = config.top_n,
        "starting run"
    );

    match top_verified_users::run(&config).await {
        Ok(summary) => {
            info!("{summary}");
            Ok(())
        }
        Err(e) => {
            error!("run failed: {e}");
            Err(e.into())
        }
    }
}
