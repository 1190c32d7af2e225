//! Invitations, notifications and the per-user audit log

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, Postgres};
use uuid::Uuid;

use crate::schema::{self, TableDef};
use crate::store::{Entity, Key};

use super::{empty_object, nullable};

/// Invitations expire after this many days unless an expiry is given
pub const DEFAULT_INVITATION_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub invited_by_user_id: Uuid,
    pub email: String,
    pub invitation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub invitation_status_value_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitationRequest {
    pub tenant_id: Uuid,
    pub organization_id: Uuid,
    pub invited_by_user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub invitation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    pub invitation_status_value_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvitationRequest {
    pub expiry_date: Option<DateTime<Utc>>,
    pub invitation_status_value_id: Option<Uuid>,
}

impl CreateInvitationRequest {
    pub fn into_row(self) -> Invitation {
        let invitation_date = self.invitation_date.unwrap_or_else(Utc::now);
        Invitation {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            organization_id: self.organization_id,
            invited_by_user_id: self.invited_by_user_id,
            email: self.email.trim().to_lowercase(),
            invitation_date,
            expiry_date: self
                .expiry_date
                .unwrap_or(invitation_date + Duration::days(DEFAULT_INVITATION_DAYS)),
            invitation_status_value_id: self.invitation_status_value_id,
            created_at: Utc::now(),
        }
    }
}

impl UpdateInvitationRequest {
    pub fn apply_to(self, row: &mut Invitation) {
        if let Some(expiry_date) = self.expiry_date {
            row.expiry_date = expiry_date;
        }
        if let Some(status) = self.invitation_status_value_id {
            row.invitation_status_value_id = status;
        }
    }
}

impl Entity for Invitation {
    const SCHEMA: &'static TableDef = &schema::INVITATIONS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "organization_id" => Some(self.organization_id.into()),
            "invited_by_user_id" => Some(self.invited_by_user_id.into()),
            "email" => Some(self.email.as_str().into()),
            "invitation_status_value_id" => Some(self.invitation_status_value_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(self.organization_id)
            .bind(self.invited_by_user_id)
            .bind(&self.email)
            .bind(self.invitation_date)
            .bind(self.expiry_date)
            .bind(self.invitation_status_value_id)
            .bind(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub recipient_user_id: Uuid,
    pub message: String,
    pub sent_date: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub tenant_id: Uuid,
    pub recipient_user_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub sent_date: Option<DateTime<Utc>>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNotificationRequest {
    pub message: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub sent_date: Option<Option<DateTime<Utc>>>,
    pub is_read: Option<bool>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateNotificationRequest {
    pub fn into_row(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            recipient_user_id: self.recipient_user_id,
            message: self.message,
            sent_date: self.sent_date,
            is_read: false,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateNotificationRequest {
    pub fn apply_to(self, row: &mut Notification) {
        if let Some(message) = self.message {
            row.message = message;
        }
        if let Some(sent_date) = self.sent_date {
            row.sent_date = sent_date;
        }
        if let Some(is_read) = self.is_read {
            row.is_read = is_read;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for Notification {
    const SCHEMA: &'static TableDef = &schema::NOTIFICATIONS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "recipient_user_id" => Some(self.recipient_user_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(self.recipient_user_id)
            .bind(&self.message)
            .bind(self.sent_date)
            .bind(self.is_read)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

/// Audit record; each user has at most one
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor_user_id: Uuid,
    pub action: String,
    pub action_date: DateTime<Utc>,
    pub details: Option<String>,
    pub additional_attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLogRequest {
    pub tenant_id: Uuid,
    pub actor_user_id: Uuid,
    pub action: String,
    #[serde(default = "super::now")]
    pub action_date: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default = "empty_object")]
    pub additional_attributes: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAuditLogRequest {
    pub action: Option<String>,
    pub action_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub details: Option<Option<String>>,
    pub additional_attributes: Option<serde_json::Value>,
}

impl CreateAuditLogRequest {
    pub fn into_row(self) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            actor_user_id: self.actor_user_id,
            action: self.action,
            action_date: self.action_date,
            details: self.details,
            additional_attributes: self.additional_attributes,
            created_at: Utc::now(),
        }
    }
}

impl UpdateAuditLogRequest {
    pub fn apply_to(self, row: &mut AuditLog) {
        if let Some(action) = self.action {
            row.action = action;
        }
        if let Some(action_date) = self.action_date {
            row.action_date = action_date;
        }
        if let Some(details) = self.details {
            row.details = details;
        }
        if let Some(attrs) = self.additional_attributes {
            row.additional_attributes = attrs;
        }
    }
}

impl Entity for AuditLog {
    const SCHEMA: &'static TableDef = &schema::AUDIT_LOG;

    fn id(&self) -> Uuid {
        self.id
    }

    fn key(&self, column: &str) -> Option<Key> {
        match column {
            "id" => Some(self.id.into()),
            "tenant_id" => Some(self.tenant_id.into()),
            "actor_user_id" => Some(self.actor_user_id.into()),
            _ => None,
        }
    }

    fn bind_columns<'q, O>(
        &'q self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(self.id)
            .bind(self.tenant_id)
            .bind(self.actor_user_id)
            .bind(&self.action)
            .bind(self.action_date)
            .bind(&self.details)
            .bind(&self.additional_attributes)
            .bind(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_expiry_defaults_from_invitation_date() {
        let sent = "2026-03-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let invitation = CreateInvitationRequest {
            tenant_id: Uuid::nil(),
            organization_id: Uuid::nil(),
            invited_by_user_id: Uuid::nil(),
            email: "New.Hire@Example.com".into(),
            invitation_date: Some(sent),
            expiry_date: None,
            invitation_status_value_id: Uuid::nil(),
        }
        .into_row();

        assert_eq!(invitation.email, "new.hire@example.com");
        assert_eq!(invitation.expiry_date - invitation.invitation_date, Duration::days(14));
    }
}
