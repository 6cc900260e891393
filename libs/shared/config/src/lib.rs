use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub meeting_api_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            meeting_api_base_url: env::var("MEETING_API_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("MEETING_API_BASE_URL not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.meeting_api_base_url.is_empty()
    }
}
