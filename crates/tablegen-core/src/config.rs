//! Compiler configuration.

use crate::model::BaseDescriptor;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default name of the implicit key column.
pub const DEFAULT_KEY_COLUMN: &str = "id";

/// Default name of the update-time column.
pub const DEFAULT_UPDATED_COLUMN: &str = "updated_at";

/// Default name of the create-time column.
pub const DEFAULT_CREATED_COLUMN: &str = "created_at";

/// Default bound of `string` columns without `maxLength`.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Source of the current time for the update-time stamping hook.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Names of the default timestamp columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumns {
    /// Refreshed on every update.
    pub updated: String,
    /// Set once on insert, never written afterwards.
    pub created: String,
}

impl Default for TimestampColumns {
    fn default() -> Self {
        Self {
            updated: DEFAULT_UPDATED_COLUMN.to_string(),
            created: DEFAULT_CREATED_COLUMN.to_string(),
        }
    }
}

/// Compiler configuration.
#[derive(Clone)]
pub struct CompilerConfig {
    /// Name of the key column generated for tables without a primary field.
    pub key_column: String,

    /// Default timestamp column names.
    pub timestamps: TimestampColumns,

    /// Length of `string` columns without `maxLength`.
    pub default_string_length: u32,

    /// Named base-descriptor overrides, selected per table by `baseModel`.
    pub base_models: HashMap<String, BaseDescriptor>,

    /// Time source for the update-time stamping hook.
    pub clock: Clock,
}

impl CompilerConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            timestamps: TimestampColumns::default(),
            default_string_length: DEFAULT_STRING_LENGTH,
            base_models: HashMap::new(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Set the implicit key column name.
    pub fn with_key_column(mut self, name: impl Into<String>) -> Self {
        self.key_column = name.into();
        self
    }

    /// Set the default timestamp column names.
    pub fn with_timestamps(
        mut self,
        updated: impl Into<String>,
        created: impl Into<String>,
    ) -> Self {
        self.timestamps = TimestampColumns {
            updated: updated.into(),
            created: created.into(),
        };
        self
    }

    /// Set the default `string` column length.
    pub fn with_default_string_length(mut self, length: u32) -> Self {
        self.default_string_length = length.max(1);
        self
    }

    /// Register a named base-descriptor override.
    pub fn with_base_model(mut self, name: impl Into<String>, base: BaseDescriptor) -> Self {
        self.base_models.insert(name.into(), base);
        self
    }

    /// Set the time source.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Look up a registered base-descriptor override.
    pub fn base_model(&self, name: &str) -> Option<&BaseDescriptor> {
        self.base_models.get(name)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerConfig")
            .field("key_column", &self.key_column)
            .field("timestamps", &self.timestamps)
            .field("default_string_length", &self.default_string_length)
            .field("base_models", &self.base_models.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
