//! User related API structs and Endpoints
use super::response::ApiError;
use crate::db::users::User;
use actix_web::get;
use actix_web::web::{Json, ReqData};
use serde::Serialize;

/// Public user details
///
/// Contains general "public" information about a user. Is accessible to all other users.
#[derive(Debug, Serialize)]
pub struct UserDetails {
    pub id: i64,
    pub display_name: String,
}

impl UserDetails {
    pub fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
        }
    }
}

/// Private user profile
///
/// Similar to [`UserDetails`], but contains additional "private" information about a user.
/// Is only accessible to the user himself.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

/// API Endpoint *GET /users/me*
///
/// Returns the [`UserProfile`] of the requesting user.
#[get("/users/me")]
pub async fn current_user_profile(
    current_user: ReqData<User>,
) -> Result<Json<UserProfile>, ApiError> {
    let current_user = current_user.into_inner();

    let user_profile = UserProfile {
        id: current_user.id,
        email: current_user.email,
        display_name: current_user.display_name,
    };

    Ok(Json(user_profile))
}
