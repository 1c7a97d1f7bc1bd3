//! Account CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use custodia_core::Account;
use custodia_db_postgres::AccountStore;

use crate::error::{ApiError, ApiResponse};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountReq {
    pub name: String,
    #[serde(rename = "ownerID", default)]
    pub owner_id: Option<Uuid>,
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl CreateAccountReq {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        Ok(())
    }

    fn into_model(self) -> Account {
        Account {
            name: self.name,
            owner_id: self.owner_id,
            parent_id: self.parent_id,
            account_type: self.account_type,
            email: self.email,
            locale: self.locale,
            is_active: true,
            ..Account::default()
        }
    }
}

/// Update payload; only supplied fields are applied to the stored account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountReq {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "ownerID", default)]
    pub owner_id: Option<Uuid>,
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateAccountReq {
    fn apply(self, account: &mut Account) {
        if let Some(v) = self.name {
            account.name = v;
        }
        if let Some(v) = self.owner_id {
            account.owner_id = Some(v);
        }
        if let Some(v) = self.parent_id {
            account.parent_id = Some(v);
        }
        if let Some(v) = self.account_type {
            account.account_type = Some(v);
        }
        if let Some(v) = self.email {
            account.email = Some(v);
        }
        if let Some(v) = self.locale {
            account.locale = Some(v);
        }
        if let Some(v) = self.starts_at {
            account.starts_at = Some(v);
        }
        if let Some(v) = self.ends_at {
            account.ends_at = Some(v);
        }
        if let Some(v) = self.is_active {
            account.is_active = v;
        }
    }
}

/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountReq>,
) -> Result<(StatusCode, Json<ApiResponse<Account>>), ApiError> {
    req.validate()?;

    let mut account = req.into_model();
    AccountStore::new(&state.pool).create(&mut account).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::data(account))))
}

/// GET /api/v1/accounts
pub async fn index_accounts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Account>>>, ApiError> {
    let accounts = AccountStore::new(&state.pool).get_all().await?;
    Ok(Json(ApiResponse::data(accounts)))
}

/// GET /api/v1/accounts/{slug}
pub async fn get_account(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let account = AccountStore::new(&state.pool)
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("account", &slug))?;

    Ok(Json(ApiResponse::data(account)))
}

/// PUT /api/v1/accounts/{slug}
pub async fn update_account(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateAccountReq>,
) -> Result<Json<ApiResponse<Account>>, ApiError> {
    let store = AccountStore::new(&state.pool);
    let mut account = store
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("account", &slug))?;

    req.apply(&mut account);
    store.update(&mut account).await?;

    Ok(Json(ApiResponse::data(account)))
}

/// DELETE /api/v1/accounts/{slug}
pub async fn delete_account(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let store = AccountStore::new(&state.pool);
    store
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("account", &slug))?;

    store.delete_by_slug(&slug).await?;

    Ok(Json(ApiResponse::data(json!({ "deleted": slug }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let req = CreateAccountReq {
            name: "  ".into(),
            owner_id: None,
            parent_id: None,
            account_type: None,
            email: None,
            locale: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_supplied_fields() {
        let mut account = Account {
            name: "Acme".into(),
            email: Some("acme@example.com".into()),
            ..Account::default()
        };

        let req: UpdateAccountReq =
            serde_json::from_value(json!({ "name": "Acme HQ" })).unwrap();
        req.apply(&mut account);

        assert_eq!(account.name, "Acme HQ");
        assert_eq!(account.email.as_deref(), Some("acme@example.com"));
    }
}
