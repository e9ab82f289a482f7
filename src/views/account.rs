//! Sign-in, registration and self-service account forms.

use serde::{Deserialize, Serialize};

use crate::content::summary::format_timestamp;
use crate::error::ValidationError;
use crate::models::{PasswordChange, ProfileUpdate, Registration, Upload, User};
use crate::permissions::AccountStatus;

pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::Required("Email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        Ok(())
    }
}

pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
    profile_image: Option<Upload>,
) -> Result<Registration, ValidationError> {
    let email = email.trim();
    let username = username.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    if username.is_empty() {
        return Err(ValidationError::Required("Username"));
    }
    if password.is_empty() {
        return Err(ValidationError::Required("Password"));
    }
    Ok(Registration {
        email: email.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        profile_image,
    })
}

/// A profile edit is only sent when it changes something.
pub fn validate_profile_update(
    current: &User,
    username: &str,
    profile_image: Option<Upload>,
) -> Result<ProfileUpdate, ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::Required("Username"));
    }
    if username == current.username && profile_image.is_none() {
        return Err(ValidationError::NoChanges);
    }
    Ok(ProfileUpdate { username: username.to_string(), profile_image })
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<PasswordChange, ValidationError> {
        if self.new_password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_CHARS));
        }
        if self.current_password.is_empty() {
            return Err(ValidationError::CurrentPasswordMissing);
        }
        Ok(PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

/// A user's profile card.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    /// Only shown on the owner's own profile.
    pub email: Option<String>,
    pub role: &'static str,
    pub status: &'static str,
    pub avatar: String,
    pub joined: String,
    pub is_own: bool,
}

impl ProfileView {
    pub fn build(user: &User, is_own: bool) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: Some(user.email.clone()).filter(|e| is_own && !e.is_empty()),
            role: user.role.as_str(),
            status: AccountStatus::of(user).label(),
            avatar: user.avatar_url(),
            joined: user.created_at.as_ref().map(format_timestamp).unwrap_or_default(),
            is_own,
        }
    }
}
