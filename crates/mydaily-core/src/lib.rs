//! Core types and utilities for mydaily.
//!
//! This crate provides the foundational types shared by the store and the
//! notification service:
//!
//! - **Identifiers**: `UserId`
//! - **Habits**: `HabitKey`, `HabitDefinition`, `HabitSet`
//! - **Completions**: `Completions`, `CompletionValue`
//! - **Records**: `HabitRecord`, `User`, `QueuedNotification`, `PendingNotification`
//! - **Activation**: `detect_activations`
//! - **Messages**: `NotificationText`, avatar mapping
//!
//! # Activation rule
//!
//! A habit is *activated* by a write when its effective count strictly
//! increases. Legacy boolean flags count as `0`/`1`, so a `false -> true`
//! flip is an activation and `true -> true` is not.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod activation;
pub mod completions;
pub mod error;
pub mod habit;
pub mod ids;
pub mod message;
pub mod record;

pub use activation::{detect_activations, detect_record_activations};
pub use completions::{CompletionValue, Completions};
pub use error::{DomainError, Result};
pub use habit::{HabitDefinition, HabitKey, HabitSet, HABITS};
pub use ids::{IdError, UserId};
pub use message::{avatar_for, NotificationText, AVATARS, DEFAULT_AVATAR};
pub use record::{habit_record_id, HabitRecord, PendingNotification, QueuedNotification, User};
