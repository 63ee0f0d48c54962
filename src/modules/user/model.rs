use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::user::schema::UserEntity;

#[derive(Deserialize, Validate)]
pub struct SignUpModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1, message = "Search keyword 'q' is required"))]
    pub q: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchQuery {
    pub fn pagination(&self) -> crate::api::pagination::PageQuery {
        crate::api::pagination::PageQuery { page: self.page, page_size: self.page_size }
    }
}

pub struct InsertUser {
    pub email: String,
    pub hash_password: String,
    pub display_name: Option<String>,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse { id: entity.id, email: entity.email, display_name: entity.display_name }
    }
}
