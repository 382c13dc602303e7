// Stage type registry: maps `type` discriminators to config decoders

use crate::stage::{ErasedStageType, StageConfig, StageError, StageType, TypedStageConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Field carrying the stage type identifier in a serialized stage config
pub const TYPE_FIELD: &str = "type";

type DecodeFn = fn(Value) -> Result<Box<dyn StageConfig>, serde_json::Error>;
type ValidateFn = Box<dyn Fn(&dyn StageConfig) -> Result<(), String> + Send + Sync>;

struct Registration {
    stage_type: ErasedStageType,
    decode: DecodeFn,
    validate: Option<ValidateFn>,
}

fn decode_config<C>(value: Value) -> Result<Box<dyn StageConfig>, serde_json::Error>
where
    C: StageConfig + DeserializeOwned + 'static,
{
    let config: C = serde_json::from_value(value)?;
    Ok(Box::new(config))
}

/// Registry of known stage kinds.
///
/// Stage modules register themselves at process start; the registry is then
/// shared read-only (usually behind an `Arc`) by the workflow loader.
#[derive(Default)]
pub struct StageTypeRegistry {
    by_id: HashMap<&'static str, Registration>,
    by_config: HashMap<TypeId, &'static str>,
}

impl StageTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every stage kind shipped in this crate
    pub fn with_builtin_stages() -> Result<Self, StageError> {
        let mut registry = Self::new();
        crate::stages::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register a config type under the stage type constant it carries
    pub fn register<C>(&mut self) -> Result<StageType<C>, StageError>
    where
        C: TypedStageConfig + DeserializeOwned,
    {
        self.insert(C::TYPE)?;
        Ok(C::TYPE)
    }

    /// Register a config type that only exposes a name, under an explicit identifier
    pub fn register_named<C>(&mut self, id: &'static str) -> Result<StageType<C>, StageError>
    where
        C: StageConfig + DeserializeOwned + 'static,
    {
        let stage_type = StageType::try_value_of(id)?;
        self.insert(stage_type)?;
        Ok(stage_type)
    }

    /// Attach a loader-side check to an already registered stage type
    pub fn set_validator<C>(
        &mut self,
        stage_type: StageType<C>,
        validator: fn(&C) -> Result<(), String>,
    ) -> Result<(), StageError>
    where
        C: StageConfig + 'static,
    {
        let registration = self
            .by_id
            .get_mut(stage_type.id())
            .ok_or_else(|| StageError::UnknownStageType(stage_type.id().to_string()))?;

        registration.validate = Some(Box::new(move |config: &dyn StageConfig| {
            match config.as_any().downcast_ref::<C>() {
                Some(config) => validator(config),
                None => Ok(()),
            }
        }));

        Ok(())
    }

    fn insert<C>(&mut self, stage_type: StageType<C>) -> Result<(), StageError>
    where
        C: StageConfig + DeserializeOwned + 'static,
    {
        let erased = stage_type.erase();

        if self.by_id.contains_key(erased.id) {
            return Err(StageError::DuplicateStageType(erased.id.to_string()));
        }
        if let Some(&existing) = self.by_config.get(&erased.config_type) {
            return Err(StageError::DuplicateConfigType {
                config_type: erased.config_type_name,
                existing,
            });
        }

        self.by_config.insert(erased.config_type, erased.id);
        self.by_id.insert(
            erased.id,
            Registration {
                stage_type: erased,
                decode: decode_config::<C>,
                validate: None,
            },
        );

        tracing::debug!(
            "Registered stage type {} for {}",
            erased.id,
            erased.config_type_name
        );

        Ok(())
    }

    /// Look up a registered stage type by identifier
    pub fn stage_type(&self, id: &str) -> Option<ErasedStageType> {
        self.by_id.get(id).map(|r| r.stage_type)
    }

    /// All registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Identifier a config is serialized under
    pub fn identifier_of(&self, config: &dyn StageConfig) -> Option<&'static str> {
        if let Some(stage_type) = config.stage_type() {
            return self.by_id.contains_key(stage_type.id).then_some(stage_type.id);
        }
        self.by_config.get(&Any::type_id(config.as_any())).copied()
    }

    /// Decode one tagged stage config object
    pub fn decode(&self, value: Value) -> Result<Box<dyn StageConfig>, StageError> {
        let Value::Object(mut fields) = value else {
            return Err(StageError::MalformedStage);
        };

        let id = match fields.remove(TYPE_FIELD) {
            Some(Value::String(id)) => id,
            _ => return Err(StageError::MissingStageType),
        };

        let registration = self
            .by_id
            .get(id.as_str())
            .ok_or_else(|| StageError::UnknownStageType(id.clone()))?;

        (registration.decode)(Value::Object(fields)).map_err(|source| {
            StageError::InvalidStageConfig {
                stage_type: id,
                source,
            }
        })
    }

    /// Encode a stage config as a tagged object
    pub fn encode(&self, config: &dyn StageConfig) -> Result<Value, StageError> {
        let id = self
            .identifier_of(config)
            .ok_or_else(|| StageError::UnregisteredStage(config.name().to_string()))?;

        let mut value = config.to_stage_value()?;
        match value.as_object_mut() {
            Some(fields) => {
                fields.insert(TYPE_FIELD.to_string(), Value::String(id.to_string()));
            }
            None => return Err(StageError::MalformedStage),
        }

        Ok(value)
    }

    /// Run the loader-side check registered for the config's stage type
    pub fn validate(&self, config: &dyn StageConfig) -> Result<(), StageError> {
        let Some(id) = self.identifier_of(config) else {
            return Err(StageError::UnregisteredStage(config.name().to_string()));
        };

        match self.by_id.get(id).and_then(|r| r.validate.as_ref()) {
            Some(validate) => validate(config).map_err(|reason| StageError::Rejected {
                stage: config.name().to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for StageTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTypeRegistry")
            .field("stage_types", &self.identifiers())
            .finish()
    }
}
