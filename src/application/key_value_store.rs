// Local key-value persistence for serialized state blobs
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Drop every stored key
    async fn clear(&self) -> Result<()>;
}
