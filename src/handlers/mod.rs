pub mod health;
pub mod recommendations;
pub mod summaries;

pub use health::health_check;
pub use recommendations::recommendations_config;
pub use summaries::get_summary;
