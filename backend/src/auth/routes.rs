use actix_web::{web, HttpResponse};
use shared::{RegisterRequest, UpdateUserRequest, UserResponse};
use uuid::Uuid;

use super::middleware::AuthenticatedUser;
use super::password;
use crate::db::user_repository::{NewUser, UserRepository, UserUpdate};
use crate::error::ApiError;

/// Create a new user account. All fields are required; malformed or
/// incomplete payloads are rejected before any row is written.
pub async fn register_user(
    users: web::Data<UserRepository>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.username.is_empty()
        || body.firstname.is_empty()
        || body.lastname.is_empty()
        || body.email.is_empty()
        || body.password.is_empty()
    {
        return Err(ApiError::BadRequest("required parameter missing".into()));
    }

    let password_hash = password::hash_password(&body.password).map_err(|e| {
        log::error!("Password hashing failed during registration: {e}");
        ApiError::Internal
    })?;

    let user = users
        .create(NewUser {
            username: body.username,
            firstname: body.firstname,
            lastname: body.lastname,
            email: body.email,
            password_hash,
        })
        .await?;

    log::info!("Registered new user {} ({})", user.username, user.id);
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Credentials were already checked by the Basic-auth middleware; this just
/// echoes the authenticated user's profile.
pub async fn login(
    users: web::Data<UserRepository>,
    requester: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = users
        .find_by_id(requester.0)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub async fn get_user(
    users: web::Data<UserRepository>,
    requester: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    if user_id != requester.0 {
        return Err(ApiError::Unauthorized(
            "you do not have access to this".into(),
        ));
    }
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

pub async fn update_user(
    users: web::Data<UserRepository>,
    requester: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    if user_id != requester.0 {
        return Err(ApiError::Unauthorized(
            "you do not have access to this".into(),
        ));
    }

    let body = body.into_inner();
    let password_hash = match &body.password {
        Some(plain) => Some(password::hash_password(plain).map_err(|e| {
            log::error!("Password hashing failed during update: {e}");
            ApiError::Internal
        })?),
        None => None,
    };

    let user = users
        .update(
            user_id,
            UserUpdate {
                username: body.username,
                firstname: body.firstname,
                lastname: body.lastname,
                email: body.email,
                active: body.active,
                password_hash,
            },
        )
        .await?;

    log::info!("Updated user {} ({})", user.username, user.id);
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
