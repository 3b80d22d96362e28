//! Firebase Cloud Messaging integration.
//!
//! FCM handles:
//! - Delivery of web push notifications to registered devices
//! - OAuth access tokens minted from a service-account key
//!
//! The HTTP v1 API takes one token per request, so a multicast is a set of
//! concurrent sends.

pub mod client;
pub mod oauth;
pub mod types;

pub use client::FcmClient;
pub use oauth::{ServiceAccountKey, ServiceAccountTokenSource};
