//! User provisioning.

use mydaily_core::{User, UserId};
use mydaily_store::{Store, StoreError};

/// Ensure users `user_1..=user_count` exist.
///
/// Existing users keep their push token. Returns the number created.
pub async fn seed_users(store: &dyn Store, count: u32) -> Result<usize, StoreError> {
    let mut created = 0;
    for n in 1..=count {
        let id = UserId::from_ordinal(n);
        if store.get_user(&id).await?.is_some() {
            continue;
        }
        store.put_user(&User::new(id, n)).await?;
        created += 1;
    }

    if created > 0 {
        tracing::info!(created, total = count, "Provisioned users");
    }
    Ok(created)
}
