//! Validation schema derivation.

use crate::catalog::{DefaultValue, FieldConstraints, FieldDef, FieldKind, SchemaSource, TableDef};
use crate::codec::TemporalFormat;
use crate::config::CompilerConfig;
use crate::ddl::FieldTypeResolver;
use crate::error::{FragmentError, Result};
use crate::fragment::FragmentMap;
use serde::Serialize;
use serde_json::{json, Value as Json};
use std::collections::BTreeMap;

/// JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    /// `"string"`.
    String,
    /// `"integer"`.
    Integer,
    /// `"number"`.
    Number,
    /// `"boolean"`.
    Boolean,
    /// `"null"`.
    Null,
}

/// The `type` keyword: one type, or a type paired with `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// A single type.
    Single(JsonType),
    /// A union of types.
    Union(Vec<JsonType>),
}

impl SchemaType {
    /// Widen to accept `null`.
    pub fn nullable(self) -> Self {
        match self {
            SchemaType::Single(JsonType::Null) => self,
            SchemaType::Single(ty) => SchemaType::Union(vec![ty, JsonType::Null]),
            SchemaType::Union(mut types) => {
                if !types.contains(&JsonType::Null) {
                    types.push(JsonType::Null);
                }
                SchemaType::Union(types)
            }
        }
    }

    /// Whether `null` is accepted.
    pub fn is_nullable(&self) -> bool {
        match self {
            SchemaType::Single(ty) => *ty == JsonType::Null,
            SchemaType::Union(types) => types.contains(&JsonType::Null),
        }
    }
}

/// A property described by keywords.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedProperty {
    /// Accepted type; absent for unconstrained documents.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,
    /// Temporal format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TemporalFormat>,
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Maximum string length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Allowed values.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Json>>,
    /// Literal default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One property of a validation schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertySchema {
    /// Derived from the field declaration.
    Typed(TypedProperty),
    /// An inlined external fragment.
    Document(Json),
}

impl PropertySchema {
    /// The temporal format of the property, if any.
    pub fn format(&self) -> Option<TemporalFormat> {
        match self {
            PropertySchema::Typed(p) => p.format,
            PropertySchema::Document(doc) => doc
                .get("format")
                .and_then(Json::as_str)
                .and_then(TemporalFormat::from_schema),
        }
    }

    /// Whether `null` is accepted.
    pub fn is_nullable(&self) -> bool {
        match self {
            PropertySchema::Typed(p) => p.ty.as_ref().map_or(true, SchemaType::is_nullable),
            PropertySchema::Document(doc) => match doc.get("type") {
                Some(Json::String(t)) => t == "null",
                Some(Json::Array(types)) => types.iter().any(|t| t == "null"),
                _ => true,
            },
        }
    }

    fn typed(ty: JsonType, format: Option<TemporalFormat>) -> Self {
        PropertySchema::Typed(TypedProperty {
            ty: Some(SchemaType::Single(ty)),
            format,
            ..Default::default()
        })
    }
}

/// Derived validation schema of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSchema {
    /// Always `"object"`.
    #[serde(rename = "type")]
    pub ty: &'static str,
    /// Required properties, in declaration order.
    pub required: Vec<String>,
    /// Property schemas.
    pub properties: BTreeMap<String, PropertySchema>,
    /// Unknown properties are rejected.
    pub additional_properties: bool,
}

impl Default for ValidationSchema {
    fn default() -> Self {
        Self {
            ty: "object",
            required: Vec::new(),
            properties: BTreeMap::new(),
            additional_properties: false,
        }
    }
}

impl ValidationSchema {
    /// Get a property schema.
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    /// Check whether a property is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Properties with a `date`, `time` or `date-time` format.
    pub fn temporal_properties(&self) -> Vec<(String, TemporalFormat)> {
        self.properties
            .iter()
            .filter_map(|(name, p)| p.format().map(|f| (name.clone(), f)))
            .collect()
    }
}

/// Derives validation schemas from table definitions.
pub struct SchemaDocumentBuilder<'a> {
    resolver: FieldTypeResolver<'a>,
    config: &'a CompilerConfig,
    fragments: &'a FragmentMap,
}

impl<'a> SchemaDocumentBuilder<'a> {
    /// Create a builder. `fragments` holds every inlined external fragment.
    pub fn new(
        source: &'a SchemaSource,
        config: &'a CompilerConfig,
        fragments: &'a FragmentMap,
    ) -> Self {
        Self {
            resolver: FieldTypeResolver::new(source, config),
            config,
            fragments,
        }
    }

    /// Build the validation schema of one table.
    pub fn build(&self, table: &TableDef) -> Result<ValidationSchema> {
        let mut schema = ValidationSchema::default();
        let keys = table.key_columns(self.config);
        let single_key = match keys.as_slice() {
            [key] => Some(key.as_str()),
            _ => None,
        };

        if !table.has_explicit_primary() {
            let key = TypedProperty {
                ty: Some(SchemaType::Single(JsonType::Integer)),
                minimum: Some(1.0),
                ..Default::default()
            };
            schema
                .properties
                .insert(self.config.key_column.clone(), PropertySchema::Typed(key));
        }

        for field in table.stored_fields() {
            let property = self.property(table, field)?;
            schema.properties.insert(field.name.clone(), property);
            if !field.nullable && single_key != Some(field.name.as_str()) {
                schema.required.push(field.name.clone());
            }
        }

        if table.has_default_fields() {
            let timestamps = &self.config.timestamps;
            for name in [&timestamps.updated, &timestamps.created] {
                schema.properties.insert(
                    name.clone(),
                    PropertySchema::typed(JsonType::String, Some(TemporalFormat::DateTime)),
                );
            }
        }

        Ok(schema)
    }

    fn property(&self, table: &TableDef, field: &FieldDef) -> Result<PropertySchema> {
        match field.kind {
            FieldKind::Json => match &field.fragment {
                Some(reference) => {
                    let document = self
                        .fragments
                        .get(reference)
                        .cloned()
                        .ok_or_else(|| FragmentError::NotFound {
                            reference: reference.clone(),
                        })?;
                    Ok(PropertySchema::Document(if field.nullable {
                        nullable_document(document)
                    } else {
                        document
                    }))
                }
                None => Ok(PropertySchema::Typed(describe(field, None, &field.constraints))),
            },
            FieldKind::Fk => {
                let borrowed = self.resolver.resolve(table, field)?;
                Ok(PropertySchema::Typed(describe(
                    field,
                    Some(borrowed.kind),
                    &borrowed.constraints,
                )))
            }
            kind => Ok(PropertySchema::Typed(describe(field, Some(kind), &field.constraints))),
        }
    }
}

/// Keywords for a field of `kind`, with metadata from `field`.
fn describe(
    field: &FieldDef,
    kind: Option<FieldKind>,
    constraints: &FieldConstraints,
) -> TypedProperty {
    let (ty, format) = match kind {
        Some(FieldKind::Id) | Some(FieldKind::Integer) => (Some(JsonType::Integer), None),
        Some(FieldKind::Number) => (Some(JsonType::Number), None),
        Some(FieldKind::Boolean) => (Some(JsonType::Boolean), None),
        Some(FieldKind::String) => (Some(JsonType::String), None),
        Some(FieldKind::Date) => (Some(JsonType::String), Some(TemporalFormat::Date)),
        Some(FieldKind::Time) => (Some(JsonType::String), Some(TemporalFormat::Time)),
        Some(FieldKind::DateTime) => (Some(JsonType::String), Some(TemporalFormat::DateTime)),
        _ => (None, None),
    };

    let mut ty = ty.map(SchemaType::Single);
    if field.nullable {
        ty = ty.map(SchemaType::nullable);
    }

    let enum_values = constraints.enum_values.as_ref().map(|values| {
        let mut values: Vec<Json> = values.iter().cloned().map(Json::String).collect();
        if field.nullable {
            values.push(Json::Null);
        }
        values
    });

    let minimum = if kind == Some(FieldKind::Id) {
        Some(1.0)
    } else {
        constraints.minimum
    };

    TypedProperty {
        ty,
        format,
        minimum,
        maximum: constraints.maximum,
        max_length: constraints.max_length,
        enum_values,
        default: match &field.default {
            Some(DefaultValue::Literal(value)) => Some(value.clone()),
            _ => None,
        },
        title: field.title.clone(),
        description: field.description.clone(),
    }
}

/// Widen an inlined document to accept `null`.
fn nullable_document(mut document: Json) -> Json {
    match document.get("type").cloned() {
        Some(Json::String(ty)) => {
            document["type"] = json!([ty, "null"]);
            document
        }
        Some(Json::Array(mut types)) => {
            if !types.iter().any(|t| t == "null") {
                types.push(json!("null"));
            }
            document["type"] = Json::Array(types);
            document
        }
        _ => json!({ "anyOf": [document, { "type": "null" }] }),
    }
}
