//! Relation resolution.
//!
//! Tables are first registered by model name, then every relation is
//! resolved against the registry. Targets are stored as [`ModelRef`]s and
//! looked up late, so mutually referencing tables need no build order.

mod join;
mod registry;
mod resolver;

pub use join::{RelationMap, ResolvedJoin, ResolvedRelation, ResolvedThrough};
pub use registry::{ModelRef, ModelRegistry};
pub use resolver::{RelationResolver, ResolvedRelations};
