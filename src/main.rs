use std::error::Error;

use api::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file, when present.
    dotenvy::dotenv().ok();

    ai_llm_service::telemetry::init("info")?;

    let cfg = AppConfig::from_env()?;
    api::start(cfg).await?;

    Ok(())
}
