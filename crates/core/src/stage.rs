use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

/// Errors raised while registering stage types or loading workflow definitions
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Stage type identifier must not be empty")]
    EmptyStageType,

    #[error("Stage type '{0}' is already registered")]
    DuplicateStageType(String),

    #[error("Config type {config_type} is already registered as stage type '{existing}'")]
    DuplicateConfigType {
        config_type: &'static str,
        existing: &'static str,
    },

    #[error("Stage config has no string 'type' field")]
    MissingStageType,

    #[error("Unknown stage type '{0}'")]
    UnknownStageType(String),

    #[error("Invalid config for stage type '{stage_type}'")]
    InvalidStageConfig {
        stage_type: String,
        source: serde_json::Error,
    },

    #[error("Stage '{0}' has no registered stage type")]
    UnregisteredStage(String),

    #[error("Stage config must be a JSON object")]
    MalformedStage,

    #[error("Workflow definition must be an array of stage configs or an object with 'stageConfigs'")]
    MalformedDefinition,

    #[error("Workflow definition contains no stages")]
    EmptyDefinition,

    #[error("Stage at position {0} has an empty name")]
    EmptyStageName(usize),

    #[error("Stage name '{0}' appears more than once in the workflow")]
    DuplicateStageName(String),

    #[error("Stage '{stage}' rejected: {reason}")]
    Rejected { stage: String, reason: String },

    #[error("Failed to read workflow definition {}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse workflow definition")]
    Json(#[from] serde_json::Error),
}

/// Identifies the concrete config type `C` a stage kind is configured with.
///
/// The identifier doubles as the `type` discriminator in serialized workflow
/// definitions, so it must be unique across a registry.
pub struct StageType<C> {
    id: &'static str,
    _config: PhantomData<fn() -> C>,
}

impl<C> StageType<C> {
    /// Build a stage type constant. An empty identifier fails const evaluation.
    pub const fn value_of(id: &'static str) -> Self {
        assert!(!id.is_empty(), "stage type identifier must not be empty");
        Self {
            id,
            _config: PhantomData,
        }
    }

    /// Fallible, non-const counterpart of [`StageType::value_of`]. An empty
    /// identifier is an error instead of a panic.
    pub fn try_value_of(id: &'static str) -> Result<Self, StageError> {
        if id.is_empty() {
            return Err(StageError::EmptyStageType);
        }
        Ok(Self {
            id,
            _config: PhantomData,
        })
    }

    pub const fn id(&self) -> &'static str {
        self.id
    }
}

impl<C: 'static> StageType<C> {
    /// Drop the static config type, keeping its runtime identity
    pub fn erase(&self) -> ErasedStageType {
        ErasedStageType {
            id: self.id,
            config_type: TypeId::of::<C>(),
            config_type_name: std::any::type_name::<C>(),
        }
    }
}

impl<C> Clone for StageType<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for StageType<C> {}

impl<C> PartialEq for StageType<C> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<C> Eq for StageType<C> {}

impl<C> fmt::Debug for StageType<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageType")
            .field("id", &self.id)
            .field("config", &std::any::type_name::<C>())
            .finish()
    }
}

impl<C> fmt::Display for StageType<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// A [`StageType`] with its config type erased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErasedStageType {
    pub id: &'static str,
    pub config_type: TypeId,
    pub config_type_name: &'static str,
}

impl<C: 'static> From<StageType<C>> for ErasedStageType {
    fn from(stage_type: StageType<C>) -> Self {
        stage_type.erase()
    }
}

impl fmt::Display for ErasedStageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// Object-safe serialization and downcasting, implemented for every
/// serializable config type.
pub trait StageValue {
    fn to_stage_value(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Serialize + Any> StageValue for T {
    fn to_stage_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Configuration for one stage of a self-service workflow.
///
/// The workflow engine dispatches on [`StageConfig::name`] rather than on the
/// concrete type. Implementations are plain data: they do not validate
/// themselves, the [`crate::WorkflowLoader`] does.
pub trait StageConfig: StageValue + fmt::Debug + Send + Sync {
    /// Stable, non-empty name of the stage this config drives
    fn name(&self) -> &str;

    /// The stage type constant carried by the concrete config type, if any
    fn stage_type(&self) -> Option<ErasedStageType> {
        None
    }
}

/// A config type that carries its own [`StageType`] constant
pub trait TypedStageConfig: StageConfig + Sized + 'static {
    const TYPE: StageType<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Serialize)]
    struct CaptchaConfig;

    impl StageConfig for CaptchaConfig {
        fn name(&self) -> &str {
            Self::TYPE.id()
        }

        fn stage_type(&self) -> Option<ErasedStageType> {
            Some(Self::TYPE.erase())
        }
    }

    impl TypedStageConfig for CaptchaConfig {
        const TYPE: StageType<Self> = StageType::value_of("captcha");
    }

    #[test]
    fn test_value_of_keeps_identifier() {
        let stage_type = StageType::<CaptchaConfig>::value_of("captcha");
        assert_eq!(stage_type.id(), "captcha");
        assert_eq!(stage_type.to_string(), "captcha");
        assert_eq!(stage_type, CaptchaConfig::TYPE);
    }

    #[test]
    fn test_try_value_of_rejects_empty_identifier() {
        let result = StageType::<CaptchaConfig>::try_value_of("");
        assert!(matches!(result, Err(StageError::EmptyStageType)));

        let stage_type = StageType::<CaptchaConfig>::try_value_of("captcha").unwrap();
        assert_eq!(stage_type, CaptchaConfig::TYPE);
    }

    #[test]
    #[should_panic(expected = "stage type identifier must not be empty")]
    fn test_value_of_panics_on_empty_identifier_at_runtime() {
        let id: &'static str = "";
        let _ = StageType::<CaptchaConfig>::value_of(std::hint::black_box(id));
    }

    #[test]
    fn test_erase_records_config_type() {
        let erased = CaptchaConfig::TYPE.erase();
        assert_eq!(erased.id, "captcha");
        assert_eq!(erased.config_type, TypeId::of::<CaptchaConfig>());
        assert!(erased.config_type_name.ends_with("CaptchaConfig"));
    }

    #[test]
    fn test_stage_value_downcasts_to_concrete_type() {
        let config: Box<dyn StageConfig> = Box::new(CaptchaConfig);
        assert!(config.as_any().downcast_ref::<CaptchaConfig>().is_some());
        assert_eq!(config.to_stage_value().unwrap(), serde_json::Value::Null);
    }
}
