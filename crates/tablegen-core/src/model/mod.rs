//! Model metadata.
//!
//! Validation schemas, lifecycle hooks and the per-table descriptors handed
//! to the ORM runtime.

mod builder;
mod descriptor;
pub mod hooks;
pub mod json_schema;

pub use builder::ModelMetadataBuilder;
pub use descriptor::ModelDescriptor;
pub use hooks::{
    BaseDescriptor, Decorator, DecoratorContext, Hook, HookPoint, HookSet, TemporalCodec,
    UpdateTimestamp,
};
pub use json_schema::{
    JsonType, PropertySchema, SchemaDocumentBuilder, SchemaType, TypedProperty, ValidationSchema,
};
