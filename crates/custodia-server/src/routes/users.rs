//! User registration, retrieval, update, deletion and signup confirmation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::warn;

use custodia_core::{User, verify_password};
use custodia_db_postgres::UserStore;
use custodia_notifications::confirmation_email;

use crate::error::{ApiError, ApiResponse};
use crate::server::AppState;

/// Registration payload.
///
/// ```json
/// {
///   "username": "wanda",
///   "password": "a-password",
///   "email": "wanda@example.com",
///   "emailConfirmation": "wanda@example.com",
///   "givenName": "Wanda",
///   "familyName": "Maximoff"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    pub username: String,
    pub password: String,
    pub email: String,
    pub email_confirmation: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub middle_names: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl CreateUserReq {
    fn validate(&self) -> Result<(), ApiError> {
        validate_username(&self.username)?;
        if self.password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }
        if self.email.is_empty() {
            return Err(ApiError::Validation("email must not be empty".into()));
        }
        if self.email != self.email_confirmation {
            return Err(ApiError::Validation(
                "email confirmation does not match".into(),
            ));
        }
        Ok(())
    }

    fn into_model(self) -> User {
        User {
            username: self.username,
            password: self.password,
            email: self.email,
            email_confirmation: self.email_confirmation,
            given_name: self.given_name,
            middle_names: self.middle_names,
            family_name: self.family_name,
            locale: self.locale,
            is_active: true,
            ..User::default()
        }
    }
}

/// Update payload; only supplied fields are applied to the stored user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserReq {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub middle_names: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub base_tz: Option<String>,
    #[serde(default)]
    pub current_tz: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateUserReq {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email
            && email.is_empty()
        {
            return Err(ApiError::Validation("email must not be empty".into()));
        }
        Ok(())
    }

    fn apply(self, user: &mut User) {
        if let Some(v) = self.username {
            user.username = v;
        }
        if let Some(v) = self.password {
            user.password = v;
        }
        if let Some(v) = self.email {
            user.email = v;
        }
        if let Some(v) = self.given_name {
            user.given_name = Some(v);
        }
        if let Some(v) = self.middle_names {
            user.middle_names = Some(v);
        }
        if let Some(v) = self.family_name {
            user.family_name = Some(v);
        }
        if let Some(v) = self.locale {
            user.locale = Some(v);
        }
        if let Some(v) = self.base_tz {
            user.base_tz = Some(v);
        }
        if let Some(v) = self.current_tz {
            user.current_tz = Some(v);
        }
        if let Some(v) = self.starts_at {
            user.starts_at = Some(v);
        }
        if let Some(v) = self.ends_at {
            user.ends_at = Some(v);
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
    }
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 4 || username.len() > 16 {
        return Err(ApiError::Validation(
            "username must be 4 to 16 characters".into(),
        ));
    }
    Ok(())
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserReq>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    req.validate()?;

    let mut user = req.into_model();
    UserStore::new(&state.pool).create(&mut user).await?;

    // Confirmation mail goes out after the insert committed; a send failure
    // never fails the registration itself.
    if let Some(mailer) = state.mailer.clone()
        && let Some(message) = confirmation_email(&user, &state.config.mailer)
    {
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&message).await {
                warn!(
                    error = %err,
                    resend = err.should_resend(),
                    "Confirmation mail failed"
                );
            }
        });
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::data(user))))
}

/// GET /api/v1/users
pub async fn index_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = UserStore::new(&state.pool).get_all().await?;
    Ok(Json(ApiResponse::data(users)))
}

/// GET /api/v1/users/{slug}
pub async fn get_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = UserStore::new(&state.pool)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("user", &slug))?;

    Ok(Json(ApiResponse::data(user)))
}

/// PUT /api/v1/users/{slug}
pub async fn update_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateUserReq>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    req.validate()?;

    let store = UserStore::new(&state.pool);
    let mut user = store
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("user", &slug))?;

    req.apply(&mut user);
    store.update(&mut user).await?;

    Ok(Json(ApiResponse::data(user)))
}

/// DELETE /api/v1/users/{slug}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let store = UserStore::new(&state.pool);
    store
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("user", &slug))?;

    store.delete_by_slug(&slug).await?;

    Ok(Json(ApiResponse::data(json!({ "deleted": slug }))))
}

/// Sign-in payload.
#[derive(Debug, Deserialize)]
pub struct SigninReq {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/users/signin
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller.
pub async fn signin_user(
    State(state): State<AppState>,
    Json(req): Json<SigninReq>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = UserStore::new(&state.pool)
        .get_by_username(&req.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let digest = user.password_digest.as_deref().ok_or(ApiError::Unauthorized)?;
    let matches = verify_password(&req.password, digest).unwrap_or(false);
    if !matches {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(ApiResponse::data(user)))
}

/// GET /api/v1/users/{slug}/verify/{token}
pub async fn confirm_user(
    State(state): State<AppState>,
    Path((slug, token)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let confirmed = UserStore::new(&state.pool).confirm(&slug, &token).await?;

    if !confirmed {
        return Err(ApiError::not_found("user confirmation", &slug));
    }

    Ok(Json(ApiResponse::data(json!({ "confirmed": slug }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_req() -> CreateUserReq {
        CreateUserReq {
            username: "wanda".into(),
            password: "a-password".into(),
            email: "wanda@example.com".into(),
            email_confirmation: "wanda@example.com".into(),
            given_name: None,
            middle_names: None,
            family_name: None,
            locale: None,
        }
    }

    #[test]
    fn test_create_req_valid() {
        assert!(valid_req().validate().is_ok());
    }

    #[test]
    fn test_username_length_bounds() {
        let mut req = valid_req();
        req.username = "abc".into();
        assert!(req.validate().is_err());

        req.username = "a".repeat(17);
        assert!(req.validate().is_err());

        req.username = "abcd".into();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_email_confirmation_must_match() {
        let mut req = valid_req();
        req.email_confirmation = "other@example.com".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_supplied_fields() {
        let mut user = User {
            username: "wanda".into(),
            email: "wanda@example.com".into(),
            given_name: Some("Wanda".into()),
            ..User::default()
        };

        let req: UpdateUserReq =
            serde_json::from_value(json!({ "email": "new@example.com" })).unwrap();
        req.validate().unwrap();
        req.apply(&mut user);

        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.username, "wanda");
        assert_eq!(user.given_name.as_deref(), Some("Wanda"));
    }
}
