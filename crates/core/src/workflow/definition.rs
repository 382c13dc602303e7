use crate::registry::StageTypeRegistry;
use crate::stage::{StageConfig, StageError};
use serde_json::Value;

/// Key of the stage array when a definition is wrapped in an object
pub const STAGE_CONFIGS_FIELD: &str = "stageConfigs";

/// Ordered list of stage configs; the order is the execution order.
#[derive(Debug, Default)]
pub struct WorkflowDefinition {
    stages: Vec<Box<dyn StageConfig>>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn with_stage(mut self, stage: impl StageConfig + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn StageConfig>) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Box<dyn StageConfig>] {
        &self.stages
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn StageConfig> {
        self.stages.iter().map(|stage| &**stage)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.iter().map(|stage| stage.name()).collect()
    }

    /// First stage whose config is of type `C`
    pub fn stage<C: 'static>(&self) -> Option<&C> {
        self.iter()
            .find_map(|stage| stage.as_any().downcast_ref::<C>())
    }

    /// Decode a definition from a tagged stage array, or from an object
    /// holding that array under `stageConfigs`.
    pub fn from_value(registry: &StageTypeRegistry, value: Value) -> Result<Self, StageError> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut fields) => match fields.remove(STAGE_CONFIGS_FIELD) {
                Some(Value::Array(items)) => items,
                _ => return Err(StageError::MalformedDefinition),
            },
            _ => return Err(StageError::MalformedDefinition),
        };

        let stages = items
            .into_iter()
            .map(|item| registry.decode(item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { stages })
    }

    /// Encode as a tagged stage array
    pub fn to_value(&self, registry: &StageTypeRegistry) -> Result<Value, StageError> {
        let stages = self
            .iter()
            .map(|stage| registry.encode(stage))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Value::Array(stages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{ResetStageConfig, UserRegistrationConfig};
    use serde_json::json;

    fn registry() -> StageTypeRegistry {
        StageTypeRegistry::with_builtin_stages().unwrap()
    }

    #[test]
    fn test_from_value_preserves_order() {
        let definition = WorkflowDefinition::from_value(
            &registry(),
            json!([
                {
                    "type": "resetStage",
                    "identityServiceUrl": "http://localhost/users",
                    "identityPasswordField": "password"
                },
                {
                    "type": "selfRegistration",
                    "identityServiceUrl": "http://localhost/users",
                    "identityEmailField": "mail"
                }
            ]),
        )
        .unwrap();

        assert_eq!(definition.len(), 2);
        assert_eq!(definition.stage_names(), vec!["resetStage", "selfRegistration"]);

        let registration = definition.stage::<UserRegistrationConfig>().unwrap();
        assert_eq!(registration.identity_email_field, "mail");
    }

    #[test]
    fn test_from_value_accepts_stage_configs_object() {
        let definition = WorkflowDefinition::from_value(
            &registry(),
            json!({
                "stageConfigs": [
                    { "type": "resetStage", "identityPasswordField": "password" }
                ]
            }),
        )
        .unwrap();

        let reset = definition.stage::<ResetStageConfig>().unwrap();
        assert_eq!(reset.identity_password_field, "password");
        assert!(reset.identity_service_url.is_empty());
    }

    #[test]
    fn test_from_value_rejects_malformed_definitions() {
        let registry = registry();

        assert!(matches!(
            WorkflowDefinition::from_value(&registry, json!("resetStage")),
            Err(StageError::MalformedDefinition)
        ));
        assert!(matches!(
            WorkflowDefinition::from_value(&registry, json!({ "stages": [] })),
            Err(StageError::MalformedDefinition)
        ));
        assert!(matches!(
            WorkflowDefinition::from_value(&registry, json!([{ "type": "unknownStage" }])),
            Err(StageError::UnknownStageType(_))
        ));
    }

    #[test]
    fn test_to_value_round_trips_through_registry() {
        let registry = registry();
        let definition = WorkflowDefinition::new()
            .with_stage(UserRegistrationConfig::new("http://localhost/users", "mail"))
            .with_stage(ResetStageConfig::new("http://localhost/users", "password"));

        let value = definition.to_value(&registry).unwrap();
        assert_eq!(value[0]["type"], "selfRegistration");
        assert_eq!(value[1]["type"], "resetStage");

        let decoded = WorkflowDefinition::from_value(&registry, value).unwrap();
        assert_eq!(decoded.stage_names(), definition.stage_names());
        assert_eq!(
            decoded.stage::<ResetStageConfig>(),
            definition.stage::<ResetStageConfig>()
        );
    }
}
