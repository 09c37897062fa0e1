//! Compiler error types.

use crate::catalog::FieldKind;
use thiserror::Error;

/// Boxed error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level compiler errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An external schema fragment could not be resolved.
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    /// The storage driver rejected an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A value could not be transcoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The project document is not valid JSON or has the wrong shape.
    #[error("invalid schema document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Schema authoring errors. All are fatal.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field declares a kind the compiler does not know.
    #[error("unsupported type \"{kind}\" for field {table}.{field}")]
    UnknownFieldKind {
        /// Owning table.
        table: String,
        /// Offending field.
        field: String,
        /// The declared kind.
        kind: String,
    },

    /// A `[type, "null"]` encoding with the wrong shape.
    #[error(
        "malformed nullable type for field {table}.{field}: \
         expected [type, \"null\"], got {encoding:?}"
    )]
    MalformedNullableType {
        /// Owning table.
        table: String,
        /// Offending field.
        field: String,
        /// The declared encoding.
        encoding: Vec<String>,
    },

    /// A relation declares a variant the compiler does not know.
    #[error("unknown relation kind \"{kind}\" for relation {table}.{relation}")]
    UnknownRelationKind {
        /// Owning table.
        table: String,
        /// Offending relation.
        relation: String,
        /// The declared kind.
        kind: String,
    },

    /// Two tables share a storage name.
    #[error("duplicate table \"{table}\"")]
    DuplicateTable {
        /// The repeated table name.
        table: String,
    },

    /// Two tables share a model name.
    #[error("duplicate model \"{model}\" declared by table {table}")]
    DuplicateModel {
        /// The second table declaring the model.
        table: String,
        /// The repeated model name.
        model: String,
    },

    /// Two fields (or a field and a generated column) share a name.
    #[error("duplicate field {table}.{field}")]
    DuplicateField {
        /// Owning table.
        table: String,
        /// The repeated field name.
        field: String,
    },

    /// A `relation`/`fk` field lacks part of its target description.
    #[error("field {table}.{field} is missing its {what}")]
    MissingTarget {
        /// Owning table.
        table: String,
        /// Offending field.
        field: String,
        /// What is missing.
        what: &'static str,
    },

    /// A reference names a table that does not exist.
    #[error("{context} references unknown table \"{target}\"")]
    UnknownTable {
        /// The referencing relation, field or key.
        context: String,
        /// The missing table.
        target: String,
    },

    /// A reference names a model that does not exist.
    #[error("{context} references unknown model \"{model}\"")]
    UnknownModel {
        /// The referencing relation.
        context: String,
        /// The missing model.
        model: String,
    },

    /// A reference names a column that does not exist.
    #[error("{context} references unknown column {table}.{column}")]
    UnknownColumn {
        /// The referencing relation, field, index or key.
        context: String,
        /// Table searched.
        table: String,
        /// The missing column.
        column: String,
    },

    /// An `fk` field borrows a type that has no scalar column representation.
    #[error("foreign key {table}.{field} cannot borrow {kind} type of {target}")]
    UnsupportedBorrowedType {
        /// Owning table.
        table: String,
        /// Offending field.
        field: String,
        /// The borrowed kind.
        kind: FieldKind,
        /// The referenced `table.column`.
        target: String,
    },

    /// A chain of `fk` fields refers back to itself.
    #[error("foreign key {table}.{field} forms a reference cycle")]
    CircularForeignKey {
        /// Owning table.
        table: String,
        /// Offending field.
        field: String,
    },

    /// A many-to-many relation without a join table.
    #[error("many-to-many relation {table}.{relation} has no through table")]
    MissingThrough {
        /// Owning table.
        table: String,
        /// Offending relation.
        relation: String,
    },

    /// Both sides of a many-to-many relation describe different join tables.
    #[error("many-to-many relation {table}.{relation} disagrees with {counterpart}: {detail}")]
    ThroughTableMismatch {
        /// Owning table.
        table: String,
        /// Offending relation.
        relation: String,
        /// The counterpart `table.relation`.
        counterpart: String,
        /// What differs.
        detail: String,
    },

    /// A standalone relation names a model its join does not reach.
    #[error("relation {table}.{relation} targets model {model} but joins table {joined}")]
    TargetMismatch {
        /// Owning table.
        table: String,
        /// Offending relation.
        relation: String,
        /// The declared target model.
        model: String,
        /// The table the join actually reaches.
        joined: String,
    },

    /// Several primary fields where an auto-increment field must stand alone.
    #[error(
        "table {table} marks {fields:?} as primary but auto-increment field {auto} \
         must be the sole primary key"
    )]
    AmbiguousPrimaryKey {
        /// Owning table.
        table: String,
        /// All primary fields.
        fields: Vec<String>,
        /// The auto-increment field.
        auto: String,
    },
}

/// External fragment resolution errors. Fatal; abort the fan-out.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// The fragment could not be read.
    #[error("failed to read fragment {reference}: {source}")]
    Io {
        /// The fragment reference.
        reference: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The fragment is not valid JSON.
    #[error("failed to parse fragment {reference}: {source}")]
    Parse {
        /// The fragment reference.
        reference: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A `$ref` inside the fragment points nowhere.
    #[error("fragment {reference} contains dangling $ref {target}")]
    DanglingRef {
        /// The fragment reference.
        reference: String,
        /// The unresolvable `$ref` value.
        target: String,
    },

    /// The resolver has no fragment under this reference.
    #[error("fragment {reference} not found")]
    NotFound {
        /// The fragment reference.
        reference: String,
    },
}

/// A storage driver rejection, with the table and operation that failed.
#[derive(Debug, Error)]
#[error("{operation} failed for table {table}: {source}")]
pub struct StorageError {
    /// Table being operated on.
    pub table: String,
    /// Operation description.
    pub operation: String,
    /// The driver's error.
    #[source]
    pub source: BoxError,
}

/// Value transcoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value could not be interpreted as a date or date-time.
    #[error("cannot convert {value} of property {property} to {format}")]
    InvalidTemporal {
        /// Property name.
        property: String,
        /// Rendered offending value.
        value: String,
        /// Target format name.
        format: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_offender() {
        let err = SchemaError::UnknownFieldKind {
            table: "person".to_string(),
            field: "ssn".to_string(),
            kind: "uuid".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("\"uuid\""));
        assert!(message.contains("person.ssn"));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError {
            table: "order".to_string(),
            operation: "add foreign key".to_string(),
            source: "table locked".into(),
        };
        assert_eq!(
            err.to_string(),
            "add foreign key failed for table order: table locked"
        );
    }

    #[test]
    fn test_error_conversion_is_transparent() {
        let err: Error = SchemaError::DuplicateTable {
            table: "person".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "duplicate table \"person\"");
    }
}
