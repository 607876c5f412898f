// autofeed-api: Async Rust client for the AutoFeed device service

pub mod client;
pub mod device;
pub mod error;
pub mod models;
pub mod reports;
pub mod schedules;
pub mod transport;

pub use client::DeviceServiceClient;
pub use error::Error;
pub use models::{
    CommandAck, CreateScheduleRequest, DeviceStatus, DispenseRequest, FeedEvent, RefillResponse,
    Schedule, ServiceHealth, Unit, WeeklyAnalytics,
};
pub use transport::TransportConfig;
