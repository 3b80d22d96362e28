//! mydaily notification service.
//!
//! This crate provides the notification pipeline for shared habit tracking
//! and the HTTP API around it:
//!
//! - Write trigger: detect newly completed habits and aggregate them
//! - Sweep: drain aggregated activations and fan out push notifications
//! - FCM HTTP v1 push transport
//! - Users, habit records and manual trigger endpoints
//!
//! # Pipeline
//!
//! ```text
//! habit write -> detect -> aggregate (record) -> [sweep tick] -> dispatch -> fanout -> delete
//! ```
//!
//! Every collaborator (store, push transport, clock) is constructed once and
//! injected; there is no process-wide client state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod fcm;
pub mod handlers;
pub mod provision;
pub mod recipients;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod transport;
pub mod triggers;

pub use aggregator::{AggregateOutcome, AggregationPolicy, Aggregator};
pub use config::{FcmConfig, PipelineSettings, ServiceConfig, StoreBackend};
pub use dispatcher::{Dispatcher, SweepReport};
pub use error::{ApiError, NotifyError};
pub use fanout::{DeliveryReport, FanoutSender};
pub use fcm::{FcmClient, ServiceAccountKey};
pub use routes::create_router;
pub use scheduler::SweepScheduler;
pub use state::AppState;
pub use transport::{
    MulticastResponse, Notification, PushError, PushTransport, TokenResult, UnconfiguredTransport,
};
pub use triggers::{Triggers, WriteOutcome};
