use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Tenant the caller belongs to, carried as `app_metadata.company_id`.
    pub fn company_id(&self) -> Option<String> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("company_id"))
            .and_then(|value| value.as_str())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        matches!(self.role.as_deref(), Some("admin") | Some("owner"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn company_id_is_read_from_app_metadata() {
        let claims: JwtClaims = serde_json::from_value(json!({
            "sub": "user-1",
            "app_metadata": {"company_id": "COMP-9"}
        }))
        .unwrap();

        assert_eq!(claims.company_id().as_deref(), Some("COMP-9"));
    }

    #[test]
    fn missing_app_metadata_has_no_company() {
        let claims: JwtClaims = serde_json::from_value(json!({"sub": "user-1"})).unwrap();
        assert!(claims.company_id().is_none());
    }
}
