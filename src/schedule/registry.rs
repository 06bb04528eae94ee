use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::processors::{
    CommentsProcessor, EngagementProcessor, InfoProcessor, OperationProcessor,
    ScriptProcessor, SummaryProcessor, TimestampsProcessor,
};

pub const EXTRACT_INFO: &str = "extract-info";
pub const GENERATE_SUMMARY: &str = "generate-summary";
pub const ANALYZE_ENGAGEMENT: &str = "analyze-engagement";
pub const EXTRACT_TIMESTAMPS: &str = "extract-timestamps";
pub const ANALYZE_COMMENTS: &str = "analyze-comments";
pub const GENERATE_SCRIPT: &str = "generate-script";

#[derive(Clone)]
pub struct OperationDefinition {
    pub id: String,
    pub name: String,
    pub processor: Arc<dyn OperationProcessor>,
}

impl OperationDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        processor: impl OperationProcessor + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            processor: Arc::new(processor),
        }
    }
}

impl std::fmt::Debug for OperationDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Public description of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationInfo {
    pub id: String,
    pub name: String,
}

/// Catalog of the operations a run may select, in display order.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    order: Vec<String>,
    definitions: HashMap<String, OperationDefinition>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(OperationDefinition::new(EXTRACT_INFO, "Extract Video Information", InfoProcessor));
        registry.register(OperationDefinition::new(GENERATE_SUMMARY, "Generate Summary", SummaryProcessor));
        registry.register(OperationDefinition::new(ANALYZE_ENGAGEMENT, "Analyze Engagement", EngagementProcessor));
        registry.register(OperationDefinition::new(EXTRACT_TIMESTAMPS, "Extract Timestamps", TimestampsProcessor));
        registry.register(OperationDefinition::new(ANALYZE_COMMENTS, "Analyze Comments", CommentsProcessor));
        registry.register(OperationDefinition::new(GENERATE_SCRIPT, "Generate Video Script", ScriptProcessor));
        registry
    }

    /// Adds a definition, replacing any existing one with the same id in place.
    pub fn register(&mut self, definition: OperationDefinition) {
        info!("Registering operation: {}", definition.id);
        if !self.definitions.contains_key(&definition.id) {
            self.order.push(definition.id.clone());
        }
        self.definitions.insert(definition.id.clone(), definition);
    }

    pub fn lookup(&self, id: &str) -> Option<&OperationDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn definitions(&self) -> Vec<OperationInfo> {
        self.order
            .iter()
            .filter_map(|id| self.definitions.get(id))
            .map(|d| OperationInfo { id: d.id.clone(), name: d.name.clone() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
