//! Request/response payloads for the HTTP surface.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Checkbox-style field: present means "remember me".
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn remember_me(&self) -> bool {
        self.remember.is_some()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ActivateForm {
    #[validate(length(min = 1, message = "matricula is required"))]
    pub matricula: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    pub password: String,
    pub password2: String,
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "war name is required"))]
    pub war_name: String,
    pub rank: Option<String>,
    pub email: Option<String>,
    pub class_id: Option<i64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestResetForm {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreRegisterForm {
    /// Matriculas separated by whitespace, commas, or newlines.
    #[validate(length(min = 1, message = "at least one matricula is required"))]
    pub matriculas: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    /// Explicit target school; defaults to the active context.
    pub school_id: Option<i64>,
}

impl PreRegisterForm {
    pub fn matricula_list(&self) -> Vec<String> {
        self.matriculas
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SchoolForm {
    #[validate(length(min = 1, message = "school name is required"))]
    pub school_name: String,
    #[validate(length(min = 1, message = "school kind is required"))]
    pub school_kind: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteSchoolForm {
    #[validate(length(min = 1, message = "password confirmation is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AffiliationForm {
    pub principal_id: i64,
    pub school_id: i64,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveAffiliationForm {
    pub principal_id: i64,
    pub school_id: i64,
}
