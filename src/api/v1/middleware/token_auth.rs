//! Handles user Authentication in API requests
use crate::api::v1::response::{ApiError, AuthenticationError};
use crate::auth::{JwtContext, VerifyError};
use crate::db::users::User;
use crate::db::DbInterface;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::Error;
use actix_web::http::header::{self, Header};
use actix_web::web::Data;
use actix_web::{web, HttpMessage, HttpRequest, ResponseError};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use core::future::ready;
use std::future::{Future, Ready};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Middleware factory
///
/// Transforms into [`TokenAuthMiddleware`]
pub struct TokenAuth {
    pub db_ctx: Data<DbInterface>,
    pub jwt_ctx: Data<JwtContext>,
}

impl<S, B> Transform<S, ServiceRequest> for TokenAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TokenAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TokenAuthMiddleware {
            service: Rc::new(service),
            db_ctx: self.db_ctx.clone(),
            jwt_ctx: self.jwt_ctx.clone(),
        }))
    }
}

/// Authentication middleware
///
/// Whenever an API request is received, the TokenAuthMiddleware will validate the access
/// token and provide the associated user as [`ReqData`](actix_web::web::ReqData) for the
/// subsequent services.
pub struct TokenAuthMiddleware<S> {
    service: Rc<S>,
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
}

type ResultFuture<O, E> = Pin<Box<dyn Future<Output = Result<O, E>>>>;

impl<S, B> Service<ServiceRequest> for TokenAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = ResultFuture<Self::Response, Self::Error>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let db_ctx = self.db_ctx.clone();
        let jwt_ctx = self.jwt_ctx.clone();

        let auth = match Authorization::<Bearer>::parse(&req) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("Unable to parse access token, {}", e);
                return Box::pin(ready(Ok(req.into_response(
                    ApiError::unauthorized()
                        .with_message("Unable to parse access token")
                        .with_www_authenticate(AuthenticationError::InvalidAccessToken)
                        .error_response()
                        .into_body(),
                ))));
            }
        };

        let access_token = auth.into_scheme().token().to_string();

        Box::pin(async move {
            let current_user = check_access_token(db_ctx, jwt_ctx, access_token).await?;

            req.extensions_mut().insert(current_user);
            service.call(req).await
        })
    }
}

/// Validates the access token and returns the matching user
///
/// The token signature and expiry are checked first, then the user is looked
/// up by the subject claim. Users unknown to the database have to call the
/// login endpoint before any authenticated request.
pub async fn check_access_token(
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
    access_token: String,
) -> Result<User, ApiError> {
    let claims = match jwt_ctx.verify_access_token(&access_token) {
        Ok(claims) => claims,
        Err(VerifyError::Expired) => {
            return Err(ApiError::unauthorized()
                .with_www_authenticate(AuthenticationError::SessionExpired));
        }
        Err(e) => {
            log::warn!("Invalid access token, {}", e);
            return Err(ApiError::unauthorized()
                .with_www_authenticate(AuthenticationError::InvalidAccessToken));
        }
    };

    let current_user = web::block(move || -> Result<User, ApiError> {
        match db_ctx.get_user_by_sub(&claims.sub)? {
            None => Err(ApiError::unauthorized()
                .with_message("Unknown user, a login is required first")
                .with_www_authenticate(AuthenticationError::InvalidAccessToken)),
            Some(user) => Ok(user),
        }
    })
    .await
    .map_err(|e| {
        log::error!("BlockingError on token validation - {}", e);
        ApiError::internal()
    })??;

    // check if the session of the last login has expired
    if chrono::Utc::now().timestamp() > current_user.id_token_exp {
        return Err(
            ApiError::unauthorized().with_www_authenticate(AuthenticationError::SessionExpired)
        );
    }

    Ok(current_user)
}

/// Authenticates the requesting user when an Authorization header is present
///
/// Used by the public read endpoints which adapt their responses for logged in
/// users but stay accessible without authentication.
pub async fn optional_token_user(
    request: &HttpRequest,
    db_ctx: Data<DbInterface>,
    jwt_ctx: Data<JwtContext>,
) -> Result<Option<User>, ApiError> {
    if request.headers().get(header::AUTHORIZATION).is_none() {
        return Ok(None);
    }

    let auth = Authorization::<Bearer>::parse(request).map_err(|e| {
        log::warn!("Unable to parse access token, {}", e);
        ApiError::unauthorized()
            .with_message("Unable to parse access token")
            .with_www_authenticate(AuthenticationError::InvalidAccessToken)
    })?;

    let access_token = auth.into_scheme().token().to_string();

    let current_user = check_access_token(db_ctx, jwt_ctx, access_token).await?;

    Ok(Some(current_user))
}
