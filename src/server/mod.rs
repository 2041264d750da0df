pub mod api;
pub mod config;
pub mod metrics;
pub mod model_server;
pub mod poller;
pub mod server;
