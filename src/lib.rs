pub mod app_context;
pub mod config;
pub mod definitions;
pub mod error;
pub mod evaluation;
pub mod jobs;
pub mod provider;
pub mod range;
pub mod scheduler;
pub mod status_store;
