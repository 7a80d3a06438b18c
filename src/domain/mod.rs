// Domain layer - Energy monitoring models and pure rules
pub mod assistant;
pub mod device;
pub mod energy;
pub mod history;
pub mod insight;
pub mod notification;
pub mod preferences;
