// Device integration boundary - simulated or real hardware behind one trait
use crate::domain::device::{DeviceCommand, DeviceReading};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Short label for logs ("simulated", "http", ...)
    fn kind(&self) -> &'static str;

    /// Fetch one fresh reading for every device the gateway knows about
    async fn poll(&self) -> Result<Vec<DeviceReading>>;

    /// Switch a device on or off
    async fn send_command(&self, device_id: &str, command: DeviceCommand) -> Result<()>;

    /// Start tracking a newly added device
    async fn register(&self, device: &DeviceReading) -> Result<()>;

    /// Stop tracking a device
    async fn unregister(&self, device_id: &str) -> Result<()>;
}
