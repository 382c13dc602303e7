use super::definition::WorkflowDefinition;
use crate::registry::StageTypeRegistry;
use crate::stage::StageError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Loads workflow definitions and rejects malformed ones before they are
/// published. Published definitions are shared read-only.
#[derive(Debug, Clone)]
pub struct WorkflowLoader {
    registry: Arc<StageTypeRegistry>,
}

impl WorkflowLoader {
    pub fn new(registry: Arc<StageTypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<StageTypeRegistry> {
        &self.registry
    }

    /// Load a definition from a JSON value
    pub fn load_value(&self, value: Value) -> Result<Arc<WorkflowDefinition>, StageError> {
        let definition = WorkflowDefinition::from_value(&self.registry, value)?;
        self.validate(&definition)?;

        tracing::debug!(
            "Loaded workflow definition with stages {:?}",
            definition.stage_names()
        );

        Ok(Arc::new(definition))
    }

    /// Load a definition from JSON text
    pub fn load_str(&self, json: &str) -> Result<Arc<WorkflowDefinition>, StageError> {
        let value: Value = serde_json::from_str(json)?;
        self.load_value(value)
    }

    /// Load a definition from a JSON file
    pub fn load_file(&self, path: &Path) -> Result<Arc<WorkflowDefinition>, StageError> {
        let content = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&content)
    }

    /// Check a definition against the loader rules: at least one stage,
    /// non-empty unique names, and each stage's registered check.
    pub fn validate(&self, definition: &WorkflowDefinition) -> Result<(), StageError> {
        if definition.is_empty() {
            return Err(StageError::EmptyDefinition);
        }

        let mut seen = HashSet::new();
        for (position, stage) in definition.iter().enumerate() {
            let name = stage.name();
            if name.is_empty() {
                return Err(StageError::EmptyStageName(position));
            }
            if !seen.insert(name) {
                return Err(StageError::DuplicateStageName(name.to_string()));
            }
            self.registry.validate(stage)?;
        }

        Ok(())
    }
}
