// Application layer - Services and the ports they depend on
pub mod device_gateway;
pub mod energy_service;
pub mod key_value_store;
pub mod monitor;
pub mod notifier;
pub mod telemetry_service;
