//! Login accounts and the registration / login DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

/// Stored account; `password_hash` is a PHC string and never serialized to clients
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Account {
    const SCHEMA: &'static TableDef = &schema::ACCOUNTS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "email" => Some(self.email.as_str().into()),
            "phone" => Some(self.phone.as_str().into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(&self.email)
            .bind(&self.name)
            .bind(&self.phone)
            .bind(&self.password_hash)
            .bind(self.is_admin)
            .bind(self.created_at)
    }
}

/// Phone numbers arrive as JSON numbers or strings; both are kept as text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PhoneInput {
    Number(u64),
    Text(String),
}

impl PhoneInput {
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub phone: PhoneInput,
    pub name: String,
    pub password: String,
}

/// Login request; either email or phone identifies the account
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<PhoneInput>,
    pub password: String,
}

/// Account update; fields left out keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<PhoneInput>,
}

/// Account as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
            phone: account.phone,
            is_admin: account.is_admin,
            created_at: account.created_at,
        }
    }
}

/// Bearer token issued at login
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub account: AccountResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_numbers_and_strings() {
        let from_number: RegisterRequest = serde_json::from_str(
            r#"{"email": "a@b.co", "phone": 9876543210, "name": "A", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(from_number.phone.into_string(), "9876543210");

        let from_text: RegisterRequest = serde_json::from_str(
            r#"{"email": "a@b.co", "phone": " 0123456789 ", "name": "A", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(from_text.phone.into_string(), "0123456789");
    }

    #[test]
    fn response_omits_password_hash() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            name: "A".into(),
            phone: "0123456789".into(),
            password_hash: "$argon2id$v=19$...".into(),
            is_admin: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(AccountResponse::from(account)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["phone"], "0123456789");
    }
}
