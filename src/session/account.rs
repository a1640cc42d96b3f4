//! Account lifecycle: registration, password change, profile edits, deletion.

use serde::Deserialize;
use tracing::{info, warn};

use super::{SessionManager, hash_password, run_write, verify_password};
use crate::db::{NewUser, UserProfile, is_unique_violation};
use crate::error::{AuthError, StoreResultExt};

const MAX_USERNAME_LEN: usize = 32;
const MIN_USERNAME_LEN: usize = 3;
const MAX_EMAIL_LEN: usize = 254;
const MAX_FULL_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// Normalized registration fields.
struct ValidRegistration {
    username: String,
    email: String,
    full_name: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<ValidRegistration, AuthError> {
        if [&self.username, &self.email, &self.full_name, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(AuthError::validation("All fields are required"));
        }

        let username = self.username.trim().to_lowercase();
        if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
            return Err(AuthError::validation(format!(
                "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
            )));
        }

        // Only allow alphanumeric and underscores
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AuthError::validation(
                "Username can only contain letters, numbers, and underscores",
            ));
        }

        Ok(ValidRegistration {
            username,
            email: validate_email(&self.email)?,
            full_name: validate_full_name(&self.full_name)?,
        })
    }
}

fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::validation("Email is required"));
    }
    if email.len() > MAX_EMAIL_LEN || !email.contains('@') {
        return Err(AuthError::validation("Invalid email address"));
    }
    Ok(email.to_lowercase())
}

fn validate_full_name(full_name: &str) -> Result<String, AuthError> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(AuthError::validation("Full name is required"));
    }
    if full_name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(AuthError::validation(format!(
            "Full name cannot be longer than {MAX_FULL_NAME_LEN} characters"
        )));
    }
    Ok(full_name.to_string())
}

impl SessionManager {
    /// Create a new account. Does not log the user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, AuthError> {
        let valid = request.validate()?;

        let taken = self
            .db
            .users()
            .is_identity_taken(&valid.username, &valid.email)
            .await
            .store_err("Failed to check username availability")?;
        if taken {
            return Err(AuthError::conflict(
                "User with this email or username already exists",
            ));
        }

        let new_user = NewUser {
            uuid: uuid::Uuid::new_v4().to_string(),
            username: valid.username,
            email: valid.email,
            full_name: valid.full_name,
            password_hash: hash_password(&request.password).await?,
        };

        let users = self.db.users();
        let created = run_write(async move { users.create(&new_user).await })
            .await
            .map_err(|e| {
                // Lost a race with a concurrent registration
                if is_unique_violation(&e) {
                    AuthError::conflict("User with this email or username already exists")
                } else {
                    AuthError::store("Failed to create user", e)
                }
            })?;

        info!(user = %created.uuid, username = %created.username, "User registered");
        Ok(created.profile())
    }

    /// Replace the password after checking the current one.
    ///
    /// Existing sessions stay valid.
    pub async fn change_password(
        &self,
        user_uuid: &str,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        if request.old_password.is_empty() || request.new_password.trim().is_empty() {
            return Err(AuthError::validation(
                "Old and new passwords are required",
            ));
        }

        let user = self.load_user(user_uuid).await?;

        if !verify_password(&request.old_password, &user.password_hash).await? {
            warn!(user = %user.uuid, "Password change rejected: wrong password");
            return Err(AuthError::InvalidCredential);
        }

        let new_hash = hash_password(&request.new_password).await?;
        let users = self.db.users();
        let id = user.id;
        let updated = run_write(async move { users.set_password_hash(id, &new_hash).await })
            .await
            .store_err("Failed to update password")?;
        if !updated {
            return Err(AuthError::Unauthorized);
        }

        info!(user = %user.uuid, "Password changed");
        Ok(())
    }

    /// Update full name and email.
    pub async fn update_details(
        &self,
        user_uuid: &str,
        request: &UpdateDetailsRequest,
    ) -> Result<UserProfile, AuthError> {
        let full_name = validate_full_name(&request.full_name)?;
        let email = validate_email(&request.email)?;

        let user = self.load_user(user_uuid).await?;

        if !email.eq_ignore_ascii_case(&user.email) {
            let owner = self
                .db
                .users()
                .get_by_identity(&email)
                .await
                .store_err("Failed to check email availability")?;
            if owner.is_some_and(|other| other.id != user.id) {
                return Err(AuthError::conflict("Email is already in use"));
            }
        }

        let users = self.db.users();
        let id = user.id;
        let profile = run_write(async move { users.update_details(id, &full_name, &email).await })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::conflict("Email is already in use")
                } else {
                    AuthError::store("Failed to update account details", e)
                }
            })?
            .ok_or(AuthError::Unauthorized)?;

        info!(user = %profile.uuid, "Account details updated");
        Ok(profile)
    }

    /// Delete the account. Its refresh token dies with the record.
    pub async fn delete_account(&self, user_uuid: &str) -> Result<(), AuthError> {
        let user = self.load_user(user_uuid).await?;

        let users = self.db.users();
        let id = user.id;
        let deleted = run_write(async move { users.delete(id).await })
            .await
            .store_err("Failed to delete user")?;
        if !deleted {
            return Err(AuthError::Unauthorized);
        }

        info!(user = %user.uuid, "Account deleted");
        Ok(())
    }
}
