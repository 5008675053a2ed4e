use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use futures_util::future::LocalBoxFuture;
use log::warn;
use serde_json::json;

use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::account::{ChangePassword, LoginRequest};
use crate::services::accounts;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: &str, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ttl.num_minutes()))
        .finish()
}

// Re-resolved per request so deleted logins and role changes apply at once.
impl FromRequest for Principal {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req).or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()));

        Box::pin(async move {
            let state = state.ok_or_else(|| AppError::InternalServerError("Application state missing".to_string()))?;
            let token = token.ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;
            let claims = state.tokens.validate_token(&token)?;
            match state.identity().find_principal(&claims.sub).await? {
                Some(principal) => Ok(principal),
                None => {
                    warn!("Token presented for unknown login {}", claims.sub);
                    Err(AppError::Unauthorized("Login no longer exists".to_string()))
                }
            }
        })
    }
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, AppError> {
    let response = accounts::login(state.identity(), &state.tokens, &body).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&response.token, state.tokens.ttl()))
        .json(response))
}

pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok().cookie(cookie).json(json!({
        "message": "Logged out",
    }))
}

pub async fn change_password(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<ChangePassword>,
) -> Result<HttpResponse, AppError> {
    accounts::change_password(state.identity(), &principal, &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Password changed successfully",
    })))
}
