use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::ENV;
use crate::api::error;

use crate::modules::user::model::{SignInModel, SignUpModel, UserResponse};
use crate::modules::user::{model::InsertUser, repository::UserRepository};
use crate::utils::{Claims, hash_password, verify_password};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn with_dependencies(repo: Arc<dyn UserRepository + Send + Sync>) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let user_entity = self.repo.find_by_id(&id).await?;
        match user_entity {
            Some(entity) => Ok(UserResponse::from(entity)),
            None => Err(error::SystemError::not_found("User not found")),
        }
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<UserResponse, error::SystemError> {
        if user.password != user.confirm_password {
            return Err(error::SystemError::bad_request("Passwords do not match"));
        }

        if self.repo.find_by_email(&user.email).await?.is_some() {
            return Err(error::SystemError::bad_request("Email already registered"));
        }

        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            email: user.email,
            hash_password,
            display_name: user.display_name,
        };

        let created = self.repo.create(&new_user).await?;
        Ok(UserResponse::from(created))
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<String, error::SystemError> {
        let user_entity = self
            .repo
            .find_by_email(&user.email)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid email or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid email or password"));
        }

        let token = Claims::new(&user_entity.id, &user_entity.role, ENV.access_token_expiration)
            .encode(ENV.jwt_secret.as_ref())?;

        Ok(token)
    }

    pub async fn search(
        &self,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<UserResponse>), error::SystemError> {
        let (count, users) = tokio::try_join!(
            self.repo.count_search(keyword),
            self.repo.search_users(keyword, limit, offset),
        )?;

        Ok((count, users.into_iter().map(UserResponse::from).collect()))
    }
}
