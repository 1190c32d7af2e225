use super::Claims;
use uuid::Uuid;

/// Authenticated account context extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Account ID (from the `sub` claim)
    pub user_id: Uuid,

    /// Account email if present in the token
    pub email: Option<String>,

    pub is_admin: bool,

    /// JWT claims
    claims: Claims,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid account ID in token")?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            is_admin: claims.is_admin(),
            claims,
        })
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            iss: "tenderhub".to_string(),
            iat: 0,
            exp: 0,
            role: role.to_string(),
            email: None,
        }
    }

    #[test]
    fn subject_must_be_a_uuid() {
        assert!(AuthContext::from_claims(claims("not-a-uuid", "user")).is_err());

        let id = Uuid::new_v4();
        let ctx = AuthContext::from_claims(claims(&id.to_string(), "admin")).unwrap();
        assert_eq!(ctx.user_id, id);
        assert!(ctx.is_admin);
        assert_eq!(ctx.claims().iss, "tenderhub");
    }
}
