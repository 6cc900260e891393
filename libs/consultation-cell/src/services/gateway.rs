use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use shared_config::AppConfig;
use shared_gateway::MeetingApiClient;

/// The submission-gateway capability the editor depends on: one read of the
/// confirmed schedule and one full-replace write. An empty write is valid and
/// means "delete every registered slot".
#[async_trait]
pub trait ScheduleGateway: Send + Sync {
    async fn fetch_schedule(&self) -> Result<Vec<NaiveDateTime>>;

    async fn submit_schedule(&self, checked_time: &[NaiveDateTime]) -> Result<()>;
}

#[async_trait]
impl<T: ScheduleGateway + ?Sized> ScheduleGateway for Arc<T> {
    async fn fetch_schedule(&self) -> Result<Vec<NaiveDateTime>> {
        (**self).fetch_schedule().await
    }

    async fn submit_schedule(&self, checked_time: &[NaiveDateTime]) -> Result<()> {
        (**self).submit_schedule(checked_time).await
    }
}

/// Meeting-service gateway bound to one signed-in employee session.
pub struct MeetingScheduleGateway {
    api: MeetingApiClient,
    auth_token: String,
}

impl MeetingScheduleGateway {
    pub fn new(config: &AppConfig, auth_token: impl Into<String>) -> Self {
        Self {
            api: MeetingApiClient::new(config),
            auth_token: auth_token.into(),
        }
    }
}

#[async_trait]
impl ScheduleGateway for MeetingScheduleGateway {
    async fn fetch_schedule(&self) -> Result<Vec<NaiveDateTime>> {
        self.api.get_employee_schedule(&self.auth_token).await
    }

    async fn submit_schedule(&self, checked_time: &[NaiveDateTime]) -> Result<()> {
        self.api
            .register_employee_schedule(&self.auth_token, checked_time)
            .await
    }
}
