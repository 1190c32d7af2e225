//! Account registration, login and maintenance

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{dummy_hash, hash_password, verify_password, PasswordError, TokenService};
use crate::config::Settings;
use crate::domain::{
    Account, AccountResponse, LoginRequest, RegisterRequest, TokenResponse, UpdateAccountRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::store::{Filter, Store};

pub const PHONE_DIGITS: usize = 10;

/// Exactly ten ASCII digits
pub fn validate_phone(phone: &str) -> ApiResult<()> {
    if phone.len() != PHONE_DIGITS || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::bad_request(format!(
            "Phone number must be exactly {} digits",
            PHONE_DIGITS
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::bad_request("Email address is not valid")),
    }
}

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name must not be empty"));
    }
    Ok(name.to_string())
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty | PasswordError::TooLong => Self::BadRequest(err.to_string()),
            PasswordError::Hash(_) | PasswordError::MalformedHash(_) => {
                Self::Internal(anyhow::Error::new(err))
            }
        }
    }
}

async fn ensure_phone_free(store: &Store, phone: &str, except: Option<Uuid>) -> ApiResult<()> {
    let existing = store.accounts.find_by(&[Filter::eq("phone", phone)]).await?;
    if existing.is_some_and(|a| Some(a.id) != except) {
        return Err(ApiError::conflict("Phone number already exists"));
    }
    Ok(())
}

async fn ensure_email_free(store: &Store, email: &str, except: Option<Uuid>) -> ApiResult<()> {
    let existing = store.accounts.find_by(&[Filter::eq("email", email)]).await?;
    if existing.is_some_and(|a| Some(a.id) != except) {
        return Err(ApiError::conflict("Email already exists"));
    }
    Ok(())
}

/// Phone format is checked before anything is read or written; then phone
/// uniqueness, then email uniqueness.
pub async fn register(
    store: &Store,
    settings: &Settings,
    req: RegisterRequest,
) -> ApiResult<Account> {
    let phone = req.phone.into_string();
    validate_phone(&phone)?;
    let email = normalize_email(&req.email)?;
    let name = validate_name(&req.name)?;

    ensure_phone_free(store, &phone, None).await?;
    ensure_email_free(store, &email, None).await?;

    let account = Account {
        id: Uuid::new_v4(),
        is_admin: settings.is_admin_email(&email),
        email,
        name,
        phone,
        password_hash: hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    let account = store.accounts.insert(account).await?;

    tracing::info!(
        account_id = %account.id,
        is_admin = account.is_admin,
        "Account registered"
    );
    Ok(account)
}

/// Unknown identifiers and wrong passwords produce the same 403
pub async fn login(
    store: &Store,
    tokens: &TokenService,
    req: LoginRequest,
) -> ApiResult<TokenResponse> {
    let filter = match (req.email, req.phone) {
        (Some(email), _) => Filter::eq("email", email.trim().to_lowercase().as_str()),
        (None, Some(phone)) => Filter::eq("phone", phone.into_string().as_str()),
        (None, None) => return Err(ApiError::bad_request("Email or phone is required")),
    };

    let invalid = || ApiError::forbidden("Invalid credentials");
    let Some(account) = store.accounts.find_by(&[filter]).await? else {
        if let Some(hash) = dummy_hash() {
            let _ = verify_password(&req.password, hash);
        }
        tracing::warn!("Login rejected: unknown account");
        return Err(invalid());
    };

    if !verify_password(&req.password, &account.password_hash)? {
        tracing::warn!(account_id = %account.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let access_token = tokens
        .issue(account.id, &account.email, account.is_admin)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    tracing::info!(account_id = %account.id, "Login succeeded");
    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: tokens.ttl_seconds(),
        account: AccountResponse::from(account),
    })
}

/// Same validation and uniqueness rules as registration, for the fields given
pub async fn update(store: &Store, id: Uuid, req: UpdateAccountRequest) -> ApiResult<Account> {
    let phone = req.phone.map(|p| p.into_string());
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    let email = req.email.as_deref().map(normalize_email).transpose()?;
    let name = req.name.as_deref().map(validate_name).transpose()?;

    let mut account = store.accounts.get(id).await?;

    if let Some(phone) = phone {
        ensure_phone_free(store, &phone, Some(id)).await?;
        account.phone = phone;
    }
    if let Some(email) = email {
        ensure_email_free(store, &email, Some(id)).await?;
        account.email = email;
    }
    if let Some(name) = name {
        account.name = name;
    }

    let account = store.accounts.update(account).await?;
    tracing::info!(account_id = %account.id, "Account updated");
    Ok(account)
}

pub async fn delete(store: &Store, id: Uuid) -> ApiResult<()> {
    if !store.accounts.delete(id).await? {
        return Err(ApiError::not_found(format!("Account {} not found", id)));
    }
    tracing::info!(account_id = %id, "Account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PhoneInput;

    fn registration(email: &str, phone: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            phone: PhoneInput::Text(phone.to_string()),
            name: "Priya".to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn phone_must_be_ten_digits() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432101").is_err());
        assert!(validate_phone("98765-4321").is_err());
        assert!(validate_phone("９８７６５４３２１０").is_err());
    }

    #[test]
    fn emails_need_both_parts() {
        assert_eq!(normalize_email(" A@B.io ").unwrap(), "a@b.io");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@b.io").is_err());
    }

    #[tokio::test]
    async fn short_phone_is_rejected_before_any_write() {
        let store = Store::memory();
        let err = register(&store, &Settings::in_memory(), registration("a@b.io", "123456789"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(store.accounts.count(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn phone_duplicate_is_reported_before_email_duplicate() {
        let store = Store::memory();
        let settings = Settings::in_memory();
        register(&store, &settings, registration("a@b.io", "9876543210"))
            .await
            .unwrap();

        let err = register(&store, &settings, registration("a@b.io", "9876543210"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Phone number already exists");

        let err = register(&store, &settings, registration("A@B.io", "9876543211"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflict: Email already exists");
        assert_eq!(store.accounts.count(&[]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let store = Store::memory();
        let settings = Settings::in_memory();
        let tokens = TokenService::from_settings(&settings);
        register(&store, &settings, registration("a@b.io", "9876543210"))
            .await
            .unwrap();

        let ok = login(
            &store,
            &tokens,
            LoginRequest {
                email: None,
                phone: Some(PhoneInput::Number(9876543210)),
                password: "correct horse".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.token_type, "bearer");
        assert!(tokens.verify(&ok.access_token).is_ok());

        let err = login(
            &store,
            &tokens,
            LoginRequest {
                email: Some("a@b.io".into()),
                phone: None,
                password: "battery staple".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_account_gets_the_same_rejection_as_a_wrong_password() {
        let store = Store::memory();
        let settings = Settings::in_memory();
        let tokens = TokenService::from_settings(&settings);
        register(&store, &settings, registration("a@b.io", "9876543210"))
            .await
            .unwrap();

        let wrong_password = login(
            &store,
            &tokens,
            LoginRequest {
                email: Some("a@b.io".into()),
                phone: None,
                password: "battery staple".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown = login(
            &store,
            &tokens,
            LoginRequest {
                email: None,
                phone: Some(PhoneInput::Text("9999999999".into())),
                password: "correct horse".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(unknown.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(unknown.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn update_keeps_uniqueness() {
        let store = Store::memory();
        let settings = Settings::in_memory();
        let first = register(&store, &settings, registration("a@b.io", "9876543210"))
            .await
            .unwrap();
        register(&store, &settings, registration("c@d.io", "9876543211"))
            .await
            .unwrap();

        let err = update(
            &store,
            first.id,
            UpdateAccountRequest {
                email: Some("c@d.io".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        // Re-saving its own phone is not a conflict
        let updated = update(
            &store,
            first.id,
            UpdateAccountRequest {
                phone: Some(PhoneInput::Text("9876543210".into())),
                name: Some("Priya R".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Priya R");
    }

    #[tokio::test]
    async fn deleting_a_missing_account_is_not_found() {
        let store = Store::memory();
        let err = delete(&store, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
