use crate::auth::Principal;
use crate::error::{Resource, TrackerError, TrackerResult};
use crate::model::{Page, User};

use super::Tracker;

impl Tracker {
    /// The caller's own account.
    pub async fn current_user(&self, principal: &Principal) -> TrackerResult<User> {
        self.users
            .get_user_by_id(principal.user_id())
            .await?
            .ok_or(TrackerError::NotFound(Resource::User))
    }

    /// All registered users. Visible to any authenticated caller.
    pub async fn list_users(&self, _principal: &Principal, page: Page) -> TrackerResult<Vec<User>> {
        Ok(self.users.list_users(page).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Page;
    use crate::tracker::test_support::*;

    #[tokio::test]
    async fn test_current_user_and_listing() {
        let tracker = setup_tracker().await;
        let alice = principal(&tracker, "alice@example.com").await;
        principal(&tracker, "bob@example.com").await;

        let me = tracker.current_user(&alice).await.unwrap();
        assert_eq!(&me.id, alice.user_id());

        let users = tracker
            .list_users(&alice, Page::new(0, Page::DEFAULT_USER_LIMIT))
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
    }
}
