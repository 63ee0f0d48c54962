use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    constants::{FRIEND_REQUEST_LIMIT, FRIEND_REQUEST_WINDOW_SECS},
    modules::{
        friend::{
            model::{FriendResponse, PendingRequestResponse},
            repository::FriendRepo,
            schema::FriendRequestEntity,
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
}

impl<R, U> FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(friend_repo: Arc<R>, user_repo: Arc<U>) -> Self {
        FriendService { friend_repo, user_repo }
    }

    pub async fn get_friends(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<FriendResponse>), error::SystemError> {
        let (count, friends) = tokio::try_join!(
            self.friend_repo.count_friends(&user_id),
            self.friend_repo.find_friends(&user_id, limit, offset),
        )?;

        Ok((count, friends))
    }

    pub async fn remove_friend(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> Result<(), error::SystemError> {
        self.friend_repo.delete_friendship(&user_id, &friend_id).await
    }

    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        to_email: &str,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let window_start =
            chrono::Utc::now() - chrono::Duration::seconds(FRIEND_REQUEST_WINDOW_SECS);
        let recent = self.friend_repo.count_recent_requests(&sender_id, window_start).await?;
        if recent >= FRIEND_REQUEST_LIMIT {
            return Err(error::SystemError::rate_limited(
                "You cannot send more than 3 friend requests within a minute",
            ));
        }

        let receiver = self
            .user_repo
            .find_by_email(to_email)
            .await?
            .ok_or_else(|| {
                error::SystemError::not_found(format!("User with email {to_email} does not exist"))
            })?;

        if receiver.id == sender_id {
            return Err(error::SystemError::bad_request(
                "You cannot send a friend request to yourself",
            ));
        }

        if self.friend_repo.find_pending_request(&sender_id, &receiver.id).await?.is_some() {
            return Err(error::SystemError::conflict(
                "You have already sent a friend request to this user",
            ));
        }

        let friend_request = self.friend_repo.create_request(&sender_id, &receiver.id).await?;

        Ok(friend_request)
    }

    pub async fn accept_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<FriendResponse, error::SystemError> {
        let from_user_id =
            self.friend_repo.accept_request_atomic(&request_id, &user_id).await?;

        let from_user = self
            .user_repo
            .find_by_id(&from_user_id)
            .await?
            .ok_or_else(|| error::SystemError::internal("Friend request sender no longer exists"))?;

        Ok(FriendResponse::from(from_user))
    }

    pub async fn reject_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.to_user_id != user_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to reject this friend request",
            ));
        }

        if request.accepted {
            return Err(error::SystemError::conflict(
                "This friend request has already been accepted",
            ));
        }

        self.friend_repo.delete_request(&request_id).await?;

        Ok(())
    }

    pub async fn get_pending_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PendingRequestResponse>, error::SystemError> {
        self.friend_repo.find_pending_to_user(&user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::friend::repository::{FriendRepository, FriendRequestRepository};
    use crate::modules::friend::schema::FriendEntity;
    use crate::modules::user::model::InsertUser;
    use crate::modules::user::schema::{UserEntity, UserRole};
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    struct MemoryUserRepo {
        users: Mutex<Vec<UserEntity>>,
    }

    impl MemoryUserRepo {
        fn with_users(emails: &[&str]) -> (Self, Vec<Uuid>) {
            let users: Vec<UserEntity> = emails
                .iter()
                .map(|email| UserEntity {
                    id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
                    email: email.to_string(),
                    hash_password: "hash".to_string(),
                    display_name: None,
                    role: UserRole::User,
                    created_at: Utc::now(),
                })
                .collect();
            let ids = users.iter().map(|u| u.id).collect();
            (Self { users: Mutex::new(users) }, ids)
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for MemoryUserRepo {
        async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn create(&self, _user: &InsertUser) -> Result<UserEntity, error::SystemError> {
            unimplemented!("not exercised by friend service tests")
        }

        async fn search_users(
            &self,
            _query: &str,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<UserEntity>, error::SystemError> {
            Ok(Vec::new())
        }

        async fn count_search(&self, _query: &str) -> Result<i64, error::SystemError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct MemoryFriendRepo {
        requests: Mutex<Vec<FriendRequestEntity>>,
        friends: Mutex<Vec<FriendEntity>>,
    }

    impl MemoryFriendRepo {
        /// Shifts every stored request into the past, simulating elapsed time.
        fn age_requests(&self, secs: i64) {
            for request in self.requests.lock().unwrap().iter_mut() {
                request.created_at -= chrono::Duration::seconds(secs);
            }
        }

        fn counterparts(&self, user_id: &Uuid) -> Vec<Uuid> {
            let mut ids: Vec<Uuid> = self
                .friends
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.user_id == *user_id || f.friend_id == *user_id)
                .map(|f| if f.user_id == *user_id { f.friend_id } else { f.user_id })
                .collect();
            ids.sort();
            ids.dedup();
            ids
        }
    }

    #[async_trait::async_trait]
    impl FriendRepository for MemoryFriendRepo {
        async fn find_friends(
            &self,
            user_id: &Uuid,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<FriendResponse>, error::SystemError> {
            Ok(self
                .counterparts(user_id)
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|id| FriendResponse { id, email: format!("{id}@test"), display_name: None })
                .collect())
        }

        async fn count_friends(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
            Ok(self.counterparts(user_id).len() as i64)
        }

        async fn delete_friendship(
            &self,
            user_id: &Uuid,
            friend_id: &Uuid,
        ) -> Result<(), error::SystemError> {
            self.friends.lock().unwrap().retain(|f| {
                !((f.user_id == *user_id && f.friend_id == *friend_id)
                    || (f.user_id == *friend_id && f.friend_id == *user_id))
            });
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl FriendRequestRepository for MemoryFriendRepo {
        async fn find_pending_request(
            &self,
            sender_id: &Uuid,
            receiver_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.from_user_id == *sender_id && r.to_user_id == *receiver_id && !r.accepted
                })
                .cloned())
        }

        async fn find_request_by_id(
            &self,
            request_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self.requests.lock().unwrap().iter().find(|r| r.id == *request_id).cloned())
        }

        async fn find_pending_to_user(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<PendingRequestResponse>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.to_user_id == *user_id && !r.accepted)
                .map(|r| PendingRequestResponse {
                    id: r.id,
                    from_email: format!("{}@test", r.from_user_id),
                    created_at: r.created_at,
                })
                .collect())
        }

        async fn count_recent_requests(
            &self,
            sender_id: &Uuid,
            since: DateTime<Utc>,
        ) -> Result<i64, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.from_user_id == *sender_id && r.created_at >= since)
                .count() as i64)
        }

        async fn create_request(
            &self,
            sender_id: &Uuid,
            receiver_id: &Uuid,
        ) -> Result<FriendRequestEntity, error::SystemError> {
            let request = FriendRequestEntity {
                id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
                from_user_id: *sender_id,
                to_user_id: *receiver_id,
                accepted: false,
                created_at: Utc::now(),
            };
            self.requests.lock().unwrap().push(request.clone());
            Ok(request)
        }

        async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError> {
            self.requests.lock().unwrap().retain(|r| r.id != *request_id);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl FriendRepo for MemoryFriendRepo {
        async fn accept_request_atomic(
            &self,
            request_id: &Uuid,
            user_id: &Uuid,
        ) -> Result<Uuid, error::SystemError> {
            let mut requests = self.requests.lock().unwrap();
            let request = requests
                .iter()
                .find(|r| r.id == *request_id)
                .cloned()
                .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

            if request.to_user_id != *user_id {
                return Err(error::SystemError::forbidden(
                    "You are not allowed to accept this friend request",
                ));
            }

            if request.accepted {
                return Err(error::SystemError::conflict(
                    "This friend request has already been accepted",
                ));
            }

            let mut friends = self.friends.lock().unwrap();
            for (a, b) in [
                (request.from_user_id, request.to_user_id),
                (request.to_user_id, request.from_user_id),
            ] {
                if !friends.iter().any(|f| f.user_id == a && f.friend_id == b) {
                    friends.push(FriendEntity { user_id: a, friend_id: b, created_at: Utc::now() });
                }
            }

            requests.retain(|r| r.id != *request_id);

            Ok(request.from_user_id)
        }
    }

    type Service = FriendService<MemoryFriendRepo, MemoryUserRepo>;

    fn setup(emails: &[&str]) -> (Service, Arc<MemoryFriendRepo>, Vec<Uuid>) {
        let (user_repo, ids) = MemoryUserRepo::with_users(emails);
        let friend_repo = Arc::new(MemoryFriendRepo::default());
        let service = FriendService::with_dependencies(friend_repo.clone(), Arc::new(user_repo));
        (service, friend_repo, ids)
    }

    #[actix_web::test]
    async fn duplicate_pending_request_is_a_conflict() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com"]);

        service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        let err = service.send_friend_request(ids[0], "b@example.com").await;

        assert!(matches!(err, Err(error::SystemError::Conflict(_))));
    }

    #[actix_web::test]
    async fn reverse_direction_request_is_allowed() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com"]);

        service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        service.send_friend_request(ids[1], "a@example.com").await.unwrap();
    }

    #[actix_web::test]
    async fn request_to_unknown_email_is_not_found() {
        let (service, _, ids) = setup(&["a@example.com"]);

        let err = service.send_friend_request(ids[0], "ghost@example.com").await;
        assert!(matches!(err, Err(error::SystemError::NotFound(_))));
    }

    #[actix_web::test]
    async fn request_to_self_is_rejected() {
        let (service, _, ids) = setup(&["a@example.com"]);

        let err = service.send_friend_request(ids[0], "a@example.com").await;
        assert!(matches!(err, Err(error::SystemError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn fourth_request_in_window_is_rate_limited() {
        let (service, friend_repo, ids) =
            setup(&["a@example.com", "b@example.com", "c@example.com", "d@example.com", "e@example.com"]);

        for email in ["b@example.com", "c@example.com", "d@example.com"] {
            service.send_friend_request(ids[0], email).await.unwrap();
        }

        let err = service.send_friend_request(ids[0], "e@example.com").await;
        assert!(matches!(err, Err(error::SystemError::RateLimited(_))));

        // an hour later the window has rolled past the earlier three
        friend_repo.age_requests(3600);
        service.send_friend_request(ids[0], "e@example.com").await.unwrap();
    }

    #[actix_web::test]
    async fn accept_by_non_recipient_is_forbidden_and_stays_pending() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com", "c@example.com"]);

        let request = service.send_friend_request(ids[0], "b@example.com").await.unwrap();

        let err = service.accept_friend_request(ids[2], request.id).await;
        assert!(matches!(err, Err(error::SystemError::Forbidden(_))));

        let pending = service.get_pending_requests(ids[1]).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, request.id);
    }

    #[actix_web::test]
    async fn accept_creates_symmetric_friendship_and_consumes_request() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com"]);

        let request = service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        let accepted = service.accept_friend_request(ids[1], request.id).await.unwrap();
        assert_eq!(accepted.id, ids[0]);

        let (count_a, friends_a) = service.get_friends(ids[0], 10, 0).await.unwrap();
        assert_eq!(count_a, 1);
        assert_eq!(friends_a[0].id, ids[1]);

        let (count_b, friends_b) = service.get_friends(ids[1], 10, 0).await.unwrap();
        assert_eq!(count_b, 1);
        assert_eq!(friends_b[0].id, ids[0]);

        assert!(service.get_pending_requests(ids[1]).await.unwrap().is_empty());

        // the request is gone, a second accept cannot find it
        let err = service.accept_friend_request(ids[1], request.id).await;
        assert!(matches!(err, Err(error::SystemError::NotFound(_))));
    }

    #[actix_web::test]
    async fn reject_deletes_request_without_friendship() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com"]);

        let request = service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        service.reject_friend_request(ids[1], request.id).await.unwrap();

        assert!(service.get_pending_requests(ids[1]).await.unwrap().is_empty());
        let (count, _) = service.get_friends(ids[0], 10, 0).await.unwrap();
        assert_eq!(count, 0);

        let err = service.reject_friend_request(ids[1], request.id).await;
        assert!(matches!(err, Err(error::SystemError::NotFound(_))));
    }

    #[actix_web::test]
    async fn reject_by_non_recipient_is_forbidden() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com", "c@example.com"]);

        let request = service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        let err = service.reject_friend_request(ids[2], request.id).await;

        assert!(matches!(err, Err(error::SystemError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn unfriend_removes_both_directions() {
        let (service, _, ids) = setup(&["a@example.com", "b@example.com"]);

        let request = service.send_friend_request(ids[0], "b@example.com").await.unwrap();
        service.accept_friend_request(ids[1], request.id).await.unwrap();

        service.remove_friend(ids[0], ids[1]).await.unwrap();

        let (count_a, _) = service.get_friends(ids[0], 10, 0).await.unwrap();
        let (count_b, _) = service.get_friends(ids[1], 10, 0).await.unwrap();
        assert_eq!((count_a, count_b), (0, 0));
    }
}
