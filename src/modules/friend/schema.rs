use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[allow(unused)]
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendEntity {
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendRequestEntity {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub accepted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
