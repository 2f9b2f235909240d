use std::error::Error;

use crate::api::HealthResponse;
use crate::core::config::ClientSettings;
use crate::core::transport::check_health;

pub fn describe_health(base_url: &str, health: &HealthResponse) -> String {
    let mut lines = vec![if health.is_healthy() {
        format!("✅ {base_url} is healthy")
    } else {
        format!("⚠️  {base_url} reported status: {}", health.status)
    }];
    if let Some(ollama) = &health.ollama {
        lines.push(format!("   ollama: {ollama}"));
    }
    lines.join("\n")
}

pub async fn run_health(
    client: reqwest::Client,
    settings: ClientSettings,
) -> Result<(), Box<dyn Error>> {
    match check_health(&client, &settings.health_url()).await {
        Ok(health) => {
            println!("{}", describe_health(&settings.base_url, &health));
            if !health.is_healthy() {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ Health check failed for {}: {err}", settings.base_url);
            std::process::exit(1);
        }
    }
}
