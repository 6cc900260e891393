use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::wire;

const EMPLOYEE_SCHEDULE_PATH: &str = "/api/v1/meeting/redis/schedule/employee";
const REGISTER_EMPLOYEE_SCHEDULE_PATH: &str = "/api/v1/meeting/redis/schedule/register/employee";
const GUARDIAN_SCHEDULE_PATH: &str = "/api/v1/meeting/redis/schedule/guardian";
const REGISTER_GUARDIAN_SCHEDULE_PATH: &str = "/api/v1/meeting/redis/schedule/register/guardian";

/// Every meeting-service endpoint wraps its payload in this envelope; only
/// `result` matters to callers and it may be absent or null.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmployeeScheduleDto {
    #[serde(default)]
    checked_time: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuardianScheduleDto {
    #[serde(default)]
    senior_id: i64,
    #[serde(default)]
    checked_time: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GuardianSchedule {
    pub senior_id: i64,
    pub checked_time: Vec<NaiveDateTime>,
}

pub struct MeetingApiClient {
    client: Client,
    base_url: String,
}

impl MeetingApiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.meeting_api_base_url.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let headers = self.get_headers(auth_token);

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Meeting API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Meeting API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch the consultation schedule the signed-in employee has registered.
    /// A missing `result` means nothing is registered yet.
    pub async fn get_employee_schedule(&self, auth_token: &str) -> Result<Vec<NaiveDateTime>> {
        let envelope: ResponseEnvelope<EmployeeScheduleDto> = self
            .request(Method::GET, EMPLOYEE_SCHEDULE_PATH, Some(auth_token), None)
            .await?;

        let dto = envelope.result.unwrap_or_default();
        dto.checked_time
            .iter()
            .map(|raw| wire::parse_datetime(raw))
            .collect()
    }

    /// Full-replace registration of the employee's schedule. An empty list is
    /// a valid request and deletes every registered slot.
    pub async fn register_employee_schedule(
        &self,
        auth_token: &str,
        checked_time: &[NaiveDateTime],
    ) -> Result<()> {
        debug!(
            "Registering employee schedule with {} slots",
            checked_time.len()
        );

        let body = json!({
            "checkedTime": checked_time
                .iter()
                .map(|time| wire::format_datetime(*time))
                .collect::<Vec<String>>(),
        });

        let _: ResponseEnvelope<Value> = self
            .request(
                Method::POST,
                REGISTER_EMPLOYEE_SCHEDULE_PATH,
                Some(auth_token),
                Some(body),
            )
            .await?;

        Ok(())
    }

    /// Fetch the schedule a guardian has requested for one senior.
    pub async fn get_guardian_schedule(
        &self,
        senior_id: i64,
        auth_token: &str,
    ) -> Result<GuardianSchedule> {
        let path = format!("{}/{}", GUARDIAN_SCHEDULE_PATH, senior_id);
        let envelope: ResponseEnvelope<GuardianScheduleDto> = self
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let dto = envelope.result.unwrap_or_default();
        let checked_time = dto
            .checked_time
            .iter()
            .map(|raw| wire::parse_datetime(raw))
            .collect::<Result<Vec<NaiveDateTime>>>()?;

        Ok(GuardianSchedule {
            senior_id: dto.senior_id,
            checked_time,
        })
    }

    /// Full-replace registration of a guardian's requested schedule.
    pub async fn register_guardian_schedule(
        &self,
        senior_id: i64,
        auth_token: &str,
        checked_time: &[NaiveDateTime],
    ) -> Result<()> {
        let body = json!({
            "seniorId": senior_id,
            "checkedTime": checked_time
                .iter()
                .map(|time| wire::format_datetime(*time))
                .collect::<Vec<String>>(),
        });

        let _: ResponseEnvelope<Value> = self
            .request(
                Method::POST,
                REGISTER_GUARDIAN_SCHEDULE_PATH,
                Some(auth_token),
                Some(body),
            )
            .await?;

        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
