use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::UserEntity;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FriendResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<UserEntity> for FriendResponse {
    fn from(user: UserEntity) -> Self {
        FriendResponse { id: user.id, email: user.email, display_name: user.display_name }
    }
}

/// A request awaiting the recipient's decision, projected to the sender.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingRequestResponse {
    pub id: Uuid,
    pub from_email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FriendRequestBody {
    #[validate(email(message = "Invalid email format"))]
    pub to_email: String,
}
