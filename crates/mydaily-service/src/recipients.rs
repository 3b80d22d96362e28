//! Recipient resolution.

use std::collections::BTreeSet;

use mydaily_core::{User, UserId};

/// Push tokens of every user other than `activating`.
///
/// Tokens equal to the activating user's own token are dropped too, so a
/// device shared between two profiles is never notified about itself.
/// Duplicate tokens are sent to once, in display order.
#[must_use]
pub fn recipient_tokens(users: &[User], activating: &UserId) -> Vec<String> {
    let own_token = users
        .iter()
        .find(|user| &user.id == activating)
        .and_then(User::push_token);

    let mut seen = BTreeSet::new();
    users
        .iter()
        .filter(|user| &user.id != activating)
        .filter_map(User::push_token)
        .filter(|token| Some(*token) != own_token)
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}
