// Application state for HTTP handlers
use crate::application::monitor::Monitor;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Monitor,
}
