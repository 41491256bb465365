pub mod client;

pub use client::{LogFetcher, SupervisorClient, UpstreamError};

pub const HOST_LOGS: &str = "/host/logs";
pub const CORE_LOGS: &str = "/core/logs";
pub const SUPERVISOR_LOGS: &str = "/supervisor/logs";
