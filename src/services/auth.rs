use actix_web::{
    dev::Payload, error::ErrorUnauthorized, web::Data, Error as ActixError, FromRequest,
    HttpRequest,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub employee_id: Option<Uuid>, // set for users with an employee record
    pub role: Role,
    pub exp: usize, // expiration time
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
    pub fn is_manager_or_admin(&self) -> bool {
        self.is_manager() || self.is_admin()
    }

    pub fn requires_manager(&self) -> Result<(), AppError> {
        if self.is_manager_or_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Manager or admin access required".to_string(),
            ))
        }
    }

    /// The caller's employee record, for self-service endpoints.
    pub fn requires_employee(&self) -> Result<Uuid, AppError> {
        self.employee_id.ok_or_else(|| {
            AppError::PermissionDenied("No employee record is linked to this user".to_string())
        })
    }

    /// Managers may act on anyone; employees only on themselves.
    pub fn requires_same_employee(&self, employee_id: Uuid) -> Result<(), AppError> {
        if self.is_manager_or_admin() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Cannot access another employee's records".to_string(),
            ))
        }
    }
}

impl FromRequest for Claims {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        if let Some(auth_header) = auth_header {
            if let Ok(auth_str) = auth_header.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    // Get the config from app data
                    if let Some(config) = req.app_data::<Data<Config>>() {
                        return match decode_token(&config.jwt_secret, token) {
                            Ok(claims) => ready(Ok(claims)),
                            Err(_) => ready(Err(ErrorUnauthorized("Invalid token"))),
                        };
                    }
                }
            }
        }

        ready(Err(ErrorUnauthorized(
            "Missing or invalid authorization header",
        )))
    }
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|token_data| token_data.claims)
}

/// Issues an HS256 token. Identity management lives outside this service; this
/// is used by operators and tests.
pub fn create_token(
    secret: &str,
    user_id: Uuid,
    employee_id: Option<Uuid>,
    role: Role,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        employee_id,
        role,
        exp: (Utc::now() + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::internal_server_error_message(format!("Failed to sign token: {}", e)))
}
