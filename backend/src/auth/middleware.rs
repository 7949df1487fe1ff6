use actix_web::dev::ServiceRequest;
use actix_web::error::InternalError;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::basic::BasicAuth;
use futures::future::{err, ok, Ready};
use uuid::Uuid;

use super::password;
use crate::db::user_repository::UserRepository;

fn unauthorized(message: &str) -> Error {
    InternalError::from_response(
        message.to_string(),
        HttpResponse::Unauthorized().json(serde_json::json!({ "error": message })),
    )
    .into()
}

/// Per-request HTTP Basic validation against the user store. On success the
/// owning user's id is stashed in the request extensions for the
/// [`AuthenticatedUser`] extractor.
pub async fn validate_credentials(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(users) = req.app_data::<web::Data<UserRepository>>().cloned() else {
        log::error!("UserRepository not configured for auth middleware");
        return Err((unauthorized("Not authorized"), req));
    };

    let username = credentials.user_id().to_string();
    let supplied = credentials.password().unwrap_or_default().to_string();

    match users.find_by_username(&username).await {
        Ok(Some(user)) if password::verify_password(&supplied, &user.password_hash) => {
            if !user.active {
                log::warn!("Rejected login for deactivated account: {}", username);
                return Err((unauthorized("User account deactivated"), req));
            }
            req.extensions_mut().insert(user.id);
            Ok(req)
        }
        Ok(_) => {
            log::warn!(
                "Failed Basic auth for user {} on path {}",
                username,
                req.path()
            );
            Err((unauthorized("Username or password not correct"), req))
        }
        Err(e) => {
            log::error!("User lookup failed during auth: {e}");
            Err((unauthorized("Not authorized"), req))
        }
    }
}

pub struct AuthenticatedUser(pub Uuid);

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Uuid>() {
            Some(user_id) => ok(AuthenticatedUser(*user_id)),
            None => {
                log::warn!(
                    "AuthenticatedUser extractor: no user id in extensions for path {}",
                    req.path()
                );
                err(unauthorized("Not authorized"))
            }
        }
    }
}
