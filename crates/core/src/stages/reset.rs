use super::{check_field, check_identity_service_url};
use crate::registry::StageTypeRegistry;
use crate::stage::{ErasedStageType, StageConfig, StageError, StageType, TypedStageConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the password reset stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetStageConfig {
    /// URL of the identity service holding the credential
    pub identity_service_url: String,
    /// Field of an identity record holding the password to reset
    pub identity_password_field: String,
}

impl ResetStageConfig {
    pub fn new(identity_service_url: impl Into<String>, identity_password_field: impl Into<String>) -> Self {
        Self {
            identity_service_url: identity_service_url.into(),
            identity_password_field: identity_password_field.into(),
        }
    }
}

impl TypedStageConfig for ResetStageConfig {
    const TYPE: StageType<Self> = StageType::value_of("resetStage");
}

impl StageConfig for ResetStageConfig {
    fn name(&self) -> &str {
        Self::TYPE.id()
    }

    fn stage_type(&self) -> Option<ErasedStageType> {
        Some(Self::TYPE.erase())
    }
}

pub fn register(registry: &mut StageTypeRegistry) -> Result<(), StageError> {
    let stage_type = registry.register::<ResetStageConfig>()?;
    registry.set_validator(stage_type, check)
}

fn check(config: &ResetStageConfig) -> Result<(), String> {
    check_identity_service_url(&config.identity_service_url)?;
    check_field("identityPasswordField", &config.identity_password_field)
}
