use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::identity::Role;

#[derive(Deserialize, Validate, Debug)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub email: String,
    pub roles: Vec<Role>,
    /// Area the client should land on after login: "admin" or "employee".
    pub landing: &'static str,
    pub token: String,
}

#[derive(Deserialize, Validate, Debug)]
pub struct ChangePassword {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub current_password: String,
    #[validate(length(min = 6, max = 100, message = "The password must be at least 6 characters long."))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "The new password and confirmation password do not match."))]
    pub confirm_password: String,
}
