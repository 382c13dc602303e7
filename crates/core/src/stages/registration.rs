use super::{check_field, check_identity_service_url};
use crate::registry::StageTypeRegistry;
use crate::stage::{StageConfig, StageError};
use serde::{Deserialize, Serialize};

/// Name of the user registration stage. The registration config carries no
/// stage type constant, so it is registered under its name.
pub const SELF_REGISTRATION: &str = "selfRegistration";

/// Configuration for the user registration stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct UserRegistrationConfig {
    /// URL of the identity service new users are created in
    pub identity_service_url: String,
    /// Field of an identity record holding the user's email address
    pub identity_email_field: String,
}

impl UserRegistrationConfig {
    pub fn new(identity_service_url: impl Into<String>, identity_email_field: impl Into<String>) -> Self {
        Self {
            identity_service_url: identity_service_url.into(),
            identity_email_field: identity_email_field.into(),
        }
    }
}

impl StageConfig for UserRegistrationConfig {
    fn name(&self) -> &str {
        SELF_REGISTRATION
    }
}

pub fn register(registry: &mut StageTypeRegistry) -> Result<(), StageError> {
    let stage_type = registry.register_named::<UserRegistrationConfig>(SELF_REGISTRATION)?;
    registry.set_validator(stage_type, check)
}

fn check(config: &UserRegistrationConfig) -> Result<(), String> {
    check_identity_service_url(&config.identity_service_url)?;
    check_field("identityEmailField", &config.identity_email_field)
}
