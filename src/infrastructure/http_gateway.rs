// HTTP device gateway - talks to a real hub exposing devices as JSON
use crate::application::device_gateway::DeviceGateway;
use crate::domain::device::{DeviceCommand, DeviceReading};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CommandBody {
    command: DeviceCommand,
}

impl HttpGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn devices_url(&self) -> String {
        format!("{}/devices", self.base_url)
    }

    fn device_url(&self, device_id: &str) -> String {
        format!("{}/devices/{}", self.base_url, urlencoding::encode(device_id))
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(MonitorError::Gateway(format!(
            "{} failed with status {}: {}",
            action, status, body
        )))
    }
}

#[async_trait]
impl DeviceGateway for HttpGateway {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn poll(&self) -> Result<Vec<DeviceReading>> {
        let response = self
            .client
            .get(self.devices_url())
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = Self::check(response, "Device poll").await?;
        let readings = response.json::<Vec<DeviceReading>>().await?;
        tracing::debug!("Polled {} devices from {}", readings.len(), self.base_url);
        Ok(readings)
    }

    async fn send_command(&self, device_id: &str, command: DeviceCommand) -> Result<()> {
        let url = format!("{}/command", self.device_url(device_id));
        let response = self.client.post(&url).json(&CommandBody { command }).send().await?;
        Self::check(response, "Device command").await?;
        Ok(())
    }

    async fn register(&self, device: &DeviceReading) -> Result<()> {
        let response = self.client.post(self.devices_url()).json(device).send().await?;
        Self::check(response, "Device registration").await?;
        Ok(())
    }

    async fn unregister(&self, device_id: &str) -> Result<()> {
        let response = self.client.delete(self.device_url(device_id)).send().await?;
        Self::check(response, "Device removal").await?;
        Ok(())
    }
}
