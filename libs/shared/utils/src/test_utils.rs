use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub company_id: Option<String>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
            company_id: Some("COMP001".to_string()),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, company_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            company_id: Some(company_id.to_string()),
        }
    }

    pub fn staff(email: &str, company_id: &str) -> Self {
        Self::new(email, "staff", company_id)
    }

    pub fn admin(email: &str, company_id: &str) -> Self {
        Self::new(email, "admin", company_id)
    }

    pub fn without_company(email: &str) -> Self {
        Self {
            company_id: None,
            ..Self::new(email, "staff", "")
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            company_id: self.company_id.clone(),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": { "company_id": user.company_id },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Row shapes returned by the PostgREST tables the appointment cell reads.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn employee_response(employee_id: &str, company_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": employee_id,
            "company_id": company_id,
            "name": name,
            "is_trashed": false
        })
    }

    pub fn client_response(client_uuid: &str, company_id: &str, code: &str, name: &str) -> serde_json::Value {
        json!({
            "id": client_uuid,
            "company_id": company_id,
            "client_code": code,
            "name": name,
            "is_trashed": false
        })
    }

    pub fn service_response(service_id: &str, company_id: &str, duration: &str, price: f64) -> serde_json::Value {
        json!({
            "id": service_id,
            "company_id": company_id,
            "name": "Haircut",
            "duration": duration,
            "price": price,
            "is_trashed": false
        })
    }

    pub fn appointment_response(appointment_id: &str, company_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "code": "#APT001",
            "company_id": company_id,
            "client_id": Uuid::new_v4(),
            "client_code": "CL001",
            "employee_id": Uuid::new_v4(),
            "service_id": Uuid::new_v4(),
            "start_time": "2024-12-25T04:30:00Z",
            "display_time": "2024-12-25 10:00",
            "note": null,
            "expire_time": "2024-12-25T05:00:00Z",
            "paid_status": "un-paid",
            "status": status,
            "is_trashed": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.is_database_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::admin("owner@example.com", "COMP042");
        assert_eq!(user.role, "admin");

        let user_model = user.to_user();
        assert_eq!(user_model.company_id.as_deref(), Some("COMP042"));
        assert!(user_model.is_admin());
    }

    #[test]
    fn test_token_round_trips_company() {
        let config = TestConfig::default();
        let user = TestUser::staff("frontdesk@example.com", "COMP007");
        let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

        let validated = validate_token(&token, &config.jwt_secret).expect("token should validate");
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.company_id.as_deref(), Some("COMP007"));
    }

    #[test]
    fn test_rejected_tokens() {
        let config = TestConfig::default();
        let user = TestUser::default();

        let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);
        assert_eq!(validate_token(&expired, &config.jwt_secret).unwrap_err(), "Token expired");

        let forged = JwtTestUtils::create_invalid_signature_token(&user);
        assert_eq!(validate_token(&forged, &config.jwt_secret).unwrap_err(), "Invalid token signature");

        let malformed = JwtTestUtils::create_malformed_token();
        assert!(validate_token(&malformed, &config.jwt_secret).is_err());

        assert_eq!(validate_token("only.two", &config.jwt_secret).unwrap_err(), "Invalid token format");
    }
}
