use actix_web::{HttpRequest, get, post, web};

use crate::api::pagination;
use crate::modules::user::{model, service::UserService};
use crate::utils::{ValidatedJson, ValidatedQuery};
use crate::{
    api::{error, success},
    middlewares::get_claims,
};

#[post("/signup")]
pub async fn sign_up(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignUpModel>,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let user = user_service.sign_up(user_data.0).await?;
    Ok(success::Success::created(Some(user)).message("User created successfully"))
}

#[post("/login")]
pub async fn sign_in(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignInModel>,
) -> Result<success::Success<model::SignInResponse>, error::Error> {
    let token = user_service.sign_in(user_data.0).await?;
    Ok(success::Success::ok(Some(model::SignInResponse { token }))
        .message("User login successful"))
}

#[get("/users/search")]
pub async fn search_users(
    user_service: web::Data<UserService>,
    query: ValidatedQuery<model::SearchQuery>,
    req: HttpRequest,
) -> Result<pagination::Page<model::UserResponse>, error::Error> {
    let page = query.0.pagination();
    let (count, results) = user_service.search(&query.0.q, page.limit(), page.offset()).await?;

    Ok(pagination::Page::new(&req, &page, count, results))
}

#[get("/profile")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.get_by_id(id).await?;
    Ok(success::Success::ok(Some(user)).message("Profile retrieved successfully"))
}
