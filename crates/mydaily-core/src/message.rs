//! Notification text.
//!
//! Each user is represented by an animal avatar picked from their display
//! order; the body lists one emoji per activated habit in catalogue order.

use crate::habit::HabitSet;

/// Avatars in display order (`displayOrder = 1` gets the first one).
pub const AVATARS: [&str; 9] = ["🦥", "🐘", "🦉", "🐈", "🐜", "🐆", "🐬", "🐇", "🐫"];

/// Avatar used when the display order has no entry.
pub const DEFAULT_AVATAR: &str = "🐾";

/// The avatar for a display order. Out-of-range orders get `DEFAULT_AVATAR`.
#[must_use]
pub fn avatar_for(display_order: u32) -> &'static str {
    display_order
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| AVATARS.get(index))
        .copied()
        .unwrap_or(DEFAULT_AVATAR)
}

/// Title and body of a habit notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationText {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
}

impl NotificationText {
    /// Build the text for a user's activated habits.
    #[must_use]
    pub fn for_activation(display_order: u32, habits: &HabitSet) -> Self {
        let avatar = avatar_for(display_order);
        let title = if habits.len() == 1 {
            format!("{avatar} a complété une habitude!")
        } else {
            format!("{avatar} a complété {} habitudes!", habits.len())
        };
        let body = habits
            .iter()
            .map(|habit| habit.emoji())
            .collect::<Vec<_>>()
            .join(" ");

        Self { title, body }
    }
}
