//! Auth related API structs and Endpoints
use super::response::{ApiError, AuthenticationError};
use crate::auth::{JwtContext, VerifyError};
use crate::db::users::{ModifyUser, NewUser, User};
use crate::db::DbInterface;
use actix_web::web::{Data, Json};
use actix_web::{post, web};
use serde::{Deserialize, Serialize};

/// The JSON Body expected when making a *POST* request on `/auth/login`
#[derive(Debug, Deserialize)]
pub struct Login {
    id_token: String,
}

/// JSON Body of the response coming from the *POST* request on `/auth/login`
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

/// API Endpoint *POST /auth/login*
///
/// Verifies the `id_token` inside the provided [`Json<Login>`] body. When the token is valid, a
/// database lookup for the requesting user is issued, if no user is found, a new user will be created.
///
/// Returns a [`LoginResponse`] containing the account of the requesting user.
#[post("/auth/login")]
pub async fn login(
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
    body: Json<Login>,
) -> Result<Json<LoginResponse>, ApiError> {
    let id_token = body.into_inner().id_token;

    let claims = match jwt_ctx.verify_access_token(&id_token) {
        Ok(claims) => claims,
        Err(e) => {
            log::warn!("Got invalid login token, {}", e);

            let authentication_error = match e {
                VerifyError::Expired => AuthenticationError::SessionExpired,
                VerifyError::Invalid => AuthenticationError::InvalidIdToken,
            };

            return Err(ApiError::unauthorized().with_www_authenticate(authentication_error));
        }
    };

    let user = web::block(move || -> Result<User, ApiError> {
        let user = db_ctx.get_user_by_sub(&claims.sub)?;

        match user {
            Some(user) => {
                let modify_user = ModifyUser {
                    email: Some(claims.email),
                    display_name: Some(claims.name),
                    id_token_exp: Some(claims.exp),
                };

                Ok(db_ctx.modify_user(user.id, modify_user)?)
            }
            None => {
                let new_user = NewUser {
                    sub: claims.sub,
                    email: claims.email,
                    display_name: claims.name,
                    id_token_exp: claims.exp,
                };

                Ok(db_ctx.create_user(new_user)?)
            }
        }
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on POST /auth/login - {}", e);
        ApiError::internal()
    })??;

    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
    }))
}
