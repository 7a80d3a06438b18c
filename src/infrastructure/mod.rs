// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod export;
pub mod http_gateway;
pub mod http_response;
pub mod log_notifier;
pub mod simulated_gateway;
pub mod store;
