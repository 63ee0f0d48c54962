use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::{FriendResponse, PendingRequestResponse};
use crate::modules::friend::schema::FriendRequestEntity;

#[async_trait::async_trait]
pub trait FriendRepository {
    /// Distinct counterparts across both directions of the symmetric rows.
    async fn find_friends(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FriendResponse>, error::SystemError>;

    async fn count_friends(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;

    async fn delete_friendship(
        &self,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<(), error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    async fn find_pending_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_pending_to_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<PendingRequestResponse>, error::SystemError>;

    /// Requests the sender has created since `since`; feeds the throttle window.
    async fn count_recent_requests(
        &self,
        sender_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, error::SystemError>;

    async fn create_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRepo: FriendRepository + FriendRequestRepository + Send + Sync {
    /// Row-locks the request, verifies the acting user and the accepted flag,
    /// then marks it accepted, inserts both friendship rows, and deletes the
    /// request in one transaction. Returns the sender's id.
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Uuid, error::SystemError>;
}
