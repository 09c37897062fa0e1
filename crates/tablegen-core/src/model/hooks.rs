//! Lifecycle hooks and the decorators that contribute them.

use super::json_schema::ValidationSchema;
use crate::catalog::TableDef;
use crate::codec::{DateTimeCodec, Record, Value};
use crate::config::CompilerConfig;
use crate::error::CodecError;
use chrono::SecondsFormat;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A hook over a record.
pub type Hook = Arc<dyn Fn(&mut Record) -> Result<(), CodecError> + Send + Sync>;

/// Lifecycle points at which the ORM runtime invokes hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPoint {
    /// Before an update is issued.
    BeforeUpdate,
    /// After a row is read from storage.
    ParseFromStorage,
    /// Before a row is written to storage.
    FormatForStorage,
}

/// Hooks of one model, per lifecycle point, in execution order.
#[derive(Clone, Default)]
pub struct HookSet {
    before_update: Vec<Hook>,
    parse_from_storage: Vec<Hook>,
    format_for_storage: Vec<Hook>,
}

impl HookSet {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook at a lifecycle point.
    pub fn add(
        &mut self,
        point: HookPoint,
        hook: impl Fn(&mut Record) -> Result<(), CodecError> + Send + Sync + 'static,
    ) {
        self.hooks_mut(point).push(Arc::new(hook));
    }

    /// Append every hook of `other` after the existing ones.
    pub fn extend(&mut self, other: HookSet) {
        self.before_update.extend(other.before_update);
        self.parse_from_storage.extend(other.parse_from_storage);
        self.format_for_storage.extend(other.format_for_storage);
    }

    /// Number of hooks at a lifecycle point.
    pub fn len(&self, point: HookPoint) -> usize {
        self.hooks(point).len()
    }

    /// Check if no hook is registered anywhere.
    pub fn is_empty(&self) -> bool {
        self.before_update.is_empty()
            && self.parse_from_storage.is_empty()
            && self.format_for_storage.is_empty()
    }

    /// Run the hooks of a lifecycle point in order. The first failure stops
    /// the chain.
    pub fn run(&self, point: HookPoint, record: &mut Record) -> Result<(), CodecError> {
        for hook in self.hooks(point) {
            hook(record)?;
        }
        Ok(())
    }

    fn hooks(&self, point: HookPoint) -> &[Hook] {
        match point {
            HookPoint::BeforeUpdate => &self.before_update,
            HookPoint::ParseFromStorage => &self.parse_from_storage,
            HookPoint::FormatForStorage => &self.format_for_storage,
        }
    }

    fn hooks_mut(&mut self, point: HookPoint) -> &mut Vec<Hook> {
        match point {
            HookPoint::BeforeUpdate => &mut self.before_update,
            HookPoint::ParseFromStorage => &mut self.parse_from_storage,
            HookPoint::FormatForStorage => &mut self.format_for_storage,
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before_update", &self.before_update.len())
            .field("parse_from_storage", &self.parse_from_storage.len())
            .field("format_for_storage", &self.format_for_storage.len())
            .finish()
    }
}

/// What a decorator sees of the model it decorates.
pub struct DecoratorContext<'a> {
    /// The table being compiled.
    pub table: &'a TableDef,
    /// Its validation schema.
    pub schema: &'a ValidationSchema,
    /// Compiler configuration.
    pub config: &'a CompilerConfig,
}

/// A behavior contributed to model descriptors.
pub trait Decorator: Send + Sync + fmt::Debug {
    /// Name reported in the compiled descriptor.
    fn name(&self) -> &str;

    /// Register hooks for one model.
    fn decorate(&self, cx: &DecoratorContext<'_>, hooks: &mut HookSet);
}

/// Stamps the update-time column before every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateTimestamp;

impl Decorator for UpdateTimestamp {
    fn name(&self) -> &str {
        "UpdateTimestamp"
    }

    fn decorate(&self, cx: &DecoratorContext<'_>, hooks: &mut HookSet) {
        if !cx.table.has_default_fields() {
            return;
        }
        let column = cx.config.timestamps.updated.clone();
        let clock = cx.config.clock.clone();
        hooks.add(HookPoint::BeforeUpdate, move |record| {
            let now = clock().to_rfc3339_opts(SecondsFormat::Millis, true);
            record.insert(column.clone(), Value::String(now));
            Ok(())
        });
    }
}

/// Applies the date/time codec on read and write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalCodec;

impl Decorator for TemporalCodec {
    fn name(&self) -> &str {
        "TemporalCodec"
    }

    fn decorate(&self, cx: &DecoratorContext<'_>, hooks: &mut HookSet) {
        let codec = Arc::new(DateTimeCodec::new(cx.schema.temporal_properties()));
        if codec.properties().is_empty() {
            return;
        }

        let read = Arc::clone(&codec);
        hooks.add(HookPoint::ParseFromStorage, move |record| {
            read.parse_record(record);
            Ok(())
        });
        hooks.add(HookPoint::FormatForStorage, move |record| codec.format_record(record));
    }
}

/// A base descriptor: decorators plus extra omitted and virtual attributes.
///
/// The standard base applies [`UpdateTimestamp`] then [`TemporalCodec`].
/// Named overrides registered in the configuration are applied after it.
#[derive(Debug, Clone, Default)]
pub struct BaseDescriptor {
    /// Decorators, in application order.
    pub decorators: Vec<Arc<dyn Decorator>>,
    /// Attributes dropped before every write.
    pub omit_from_storage: Vec<String>,
    /// Attributes computed on read.
    pub virtual_attributes: Vec<String>,
}

impl BaseDescriptor {
    /// Create an empty base descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The base applied to every model.
    pub fn standard() -> Self {
        Self::new()
            .with_decorator(UpdateTimestamp)
            .with_decorator(TemporalCodec)
    }

    /// Append a decorator.
    pub fn with_decorator(mut self, decorator: impl Decorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    /// Drop an attribute before every write.
    pub fn omitting(mut self, attribute: impl Into<String>) -> Self {
        self.omit_from_storage.push(attribute.into());
        self
    }

    /// Declare a computed attribute.
    pub fn with_virtual(mut self, attribute: impl Into<String>) -> Self {
        self.virtual_attributes.push(attribute.into());
        self
    }

    /// Names of the decorators, in order.
    pub fn decorator_names(&self) -> Vec<String> {
        self.decorators.iter().map(|d| d.name().to_string()).collect()
    }

    /// Collect the hooks of every decorator, in order.
    pub fn hooks(&self, cx: &DecoratorContext<'_>) -> HookSet {
        let mut hooks = HookSet::new();
        for decorator in &self.decorators {
            decorator.decorate(cx, &mut hooks);
        }
        hooks
    }

    /// Append the decorators and attributes of `other`.
    pub fn merge(mut self, other: &BaseDescriptor) -> Self {
        self.decorators.extend(other.decorators.iter().cloned());
        self.omit_from_storage.extend(other.omit_from_storage.iter().cloned());
        self.virtual_attributes.extend(other.virtual_attributes.iter().cloned());
        self
    }
}
