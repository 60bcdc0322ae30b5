use async_trait::async_trait;
use countdown_core::models::{
    ApiConfig, Project, ProjectId, TimerDraft, TimerId, TimerPayload, TimerSnapshot,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::ControlApi;
use crate::{ClientError, Result};

/// reqwest-backed [`ControlApi`].
#[derive(Debug, Clone)]
pub struct HttpControlApi {
    client: Client,
    base_url: String,
}

impl HttpControlApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    fn project_url(&self, project_id: &ProjectId) -> String {
        format!("{}/api/projects/{}", self.base_url, project_id)
    }

    fn timer_url(&self, project_id: &ProjectId, timer_id: &TimerId) -> String {
        format!("{}/timers/{}", self.project_url(project_id), timer_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    async fn command(&self, url: String) -> Result<()> {
        tracing::debug!("POST {}", url);
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(message));
    }

    Err(ClientError::Status {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    })
}

/// Pull a human-readable message out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "description"]
        .iter()
        .find_map(|key| value.get(key)?.as_str().map(str::to_string))
}

#[async_trait]
impl ControlApi for HttpControlApi {
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project> {
        let response = self.send(self.client.get(self.project_url(project_id))).await?;
        Ok(response.json().await?)
    }

    async fn get_timer(
        &self,
        project_id: &ProjectId,
        timer_id: &TimerId,
    ) -> Result<TimerPayload> {
        let response = self
            .send(self.client.get(self.timer_url(project_id, timer_id)))
            .await?;
        Ok(response.json().await?)
    }

    async fn get_selected_timer(&self, project_id: &ProjectId) -> Result<TimerPayload> {
        let url = format!("{}/selected-timer", self.project_url(project_id));
        let response = self.send(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn create_timer(
        &self,
        project_id: &ProjectId,
        draft: &TimerDraft,
    ) -> Result<TimerSnapshot> {
        let url = format!("{}/timers", self.project_url(project_id));
        let response = self.send(self.client.post(url).json(draft)).await?;
        Ok(response.json().await?)
    }

    async fn update_timer(
        &self,
        project_id: &ProjectId,
        timer_id: &TimerId,
        draft: &TimerDraft,
    ) -> Result<TimerPayload> {
        let response = self
            .send(self.client.put(self.timer_url(project_id, timer_id)).json(draft))
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.send(self.client.delete(self.timer_url(project_id, timer_id)))
            .await?;
        Ok(())
    }

    async fn start_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.command(format!("{}/start", self.timer_url(project_id, timer_id)))
            .await
    }

    async fn pause_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.command(format!("{}/pause", self.timer_url(project_id, timer_id)))
            .await
    }

    async fn reset_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.command(format!("{}/reset", self.timer_url(project_id, timer_id)))
            .await
    }

    async fn select_timer(&self, project_id: &ProjectId, timer_id: &TimerId) -> Result<()> {
        self.command(format!(
            "{}/select-timer/{}",
            self.project_url(project_id),
            timer_id
        ))
        .await
    }

    async fn deselect_timer(&self, project_id: &ProjectId) -> Result<()> {
        self.command(format!("{}/deselect-timer", self.project_url(project_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let api = HttpControlApi::new("http://localhost:5000/");
        let project = ProjectId::from(1);
        let timer = TimerId::from(7);

        assert_eq!(
            api.project_url(&project),
            "http://localhost:5000/api/projects/1"
        );
        assert_eq!(
            api.timer_url(&project, &timer),
            "http://localhost:5000/api/projects/1/timers/7"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message": "No timer selected for this project"}"#).as_deref(),
            Some("No timer selected for this project")
        );
        assert_eq!(
            error_message(r#"{"error": "Timer name and duration required"}"#).as_deref(),
            Some("Timer name and duration required")
        );
        assert_eq!(error_message("<html>Not Found</html>"), None);
        assert_eq!(error_message(r#"{"code": 3}"#), None);
    }
}
