//! Integration tests for the compilation pipeline.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use tablegen_core::codec::{Record, Value};
use tablegen_core::ddl::ColumnType;
use tablegen_core::error::BoxError;
use tablegen_core::{
    apply, CompiledSchema, Compiler, CompilerConfig, Error, FileFragmentResolver, ForeignKeyOp,
    MemoryFragmentResolver, SchemaError, SchemaSource, SqlScriptDriver, StorageDriver, TablePlan,
};
use tempfile::TempDir;

async fn compile(project: serde_json::Value) -> Result<CompiledSchema, Error> {
    let source = SchemaSource::from_json(&project.to_string())?;
    Compiler::new(MemoryFragmentResolver::new(), CompilerConfig::default())
        .compile(&source)
        .await
}

fn shop() -> serde_json::Value {
    json!({
        "tables": [
            {
                "name": "customer",
                "modelName": "Customer",
                "fields": [
                    { "name": "id", "type": "id" },
                    { "name": "name", "type": "string" }
                ]
            },
            {
                "name": "order",
                "modelName": "Order",
                "fields": [
                    { "name": "id", "type": "id" },
                    {
                        "name": "customerId",
                        "type": "fk",
                        "table": "customer",
                        "to": "id",
                        "cascadeOnDelete": true
                    },
                    { "name": "placedOn", "type": ["date", "null"] }
                ]
            }
        ]
    })
}

fn movies(movie_through: serde_json::Value) -> serde_json::Value {
    json!({
        "tables": [
            {
                "name": "critic",
                "modelName": "Critic",
                "fields": [
                    { "name": "id", "type": "id" },
                    {
                        "name": "movies",
                        "type": "relation",
                        "table": "movie",
                        "kind": "ManyToMany",
                        "through": {
                            "table": "review",
                            "from": "criticId",
                            "to": "movieId",
                            "extra": ["stars"]
                        }
                    }
                ]
            },
            {
                "name": "movie",
                "modelName": "Movie",
                "fields": [
                    { "name": "id", "type": "id" },
                    {
                        "name": "critics",
                        "type": "relation",
                        "table": "critic",
                        "kind": "ManyToMany",
                        "through": movie_through
                    }
                ]
            },
            {
                "name": "review",
                "modelName": "Review",
                "fields": [
                    {
                        "name": "criticId", "type": "fk",
                        "table": "critic", "to": "id", "primary": true
                    },
                    {
                        "name": "movieId", "type": "fk",
                        "table": "movie", "to": "id", "primary": true
                    },
                    { "name": "stars", "type": "integer", "minimum": 0, "maximum": 5 }
                ]
            }
        ]
    })
}

#[tokio::test]
async fn test_customer_order_end_to_end() {
    let compiled = compile(shop()).await.unwrap();

    let customer = compiled.plan.table("customer").unwrap();
    let id = customer.column("id").unwrap();
    assert_eq!(id.column_type, ColumnType::Increments);
    assert!(id.is_primary());
    let name = customer.column("name").unwrap();
    assert_eq!(name.column_type, ColumnType::String { length: 255 });
    assert!(!name.is_nullable());

    let order = compiled.plan.table("order").unwrap();
    assert_eq!(order.column("id").unwrap().column_type, ColumnType::Increments);
    let customer_id = order.column("customerId").unwrap();
    assert_eq!(customer_id.column_type, ColumnType::Integer);
    assert!(customer_id.is_unsigned());
    assert!(!customer_id.is_nullable());

    assert_eq!(
        compiled.plan.foreign_keys,
        vec![ForeignKeyOp::new("order", "customerId", "customer", "id").with_cascade(true)]
    );
}

#[tokio::test]
async fn test_validation_schema_nullability() {
    let compiled = compile(shop()).await.unwrap();
    let order = compiled.table_model("order").unwrap();
    let schema = serde_json::to_value(&order.json_schema).unwrap();

    assert_eq!(schema["properties"]["placedOn"]["type"], json!(["string", "null"]));
    assert_eq!(schema["properties"]["placedOn"]["format"], "date");
    assert_eq!(schema["properties"]["customerId"]["minimum"], json!(1.0));
    assert_eq!(schema["properties"]["updated_at"]["format"], "date-time");
    assert_eq!(schema["required"], json!(["customerId"]));
    assert_eq!(schema["additionalProperties"], false);
}

#[tokio::test]
async fn test_many_to_many_symmetry() {
    let through = json!({
        "table": "review",
        "from": "movieId",
        "to": "criticId",
        "extra": ["stars"]
    });
    let compiled = compile(movies(through)).await.unwrap();

    let critic = compiled.table_model("critic").unwrap().relation("movies").unwrap();
    let movie = compiled.table_model("movie").unwrap().relation("critics").unwrap();
    let from_critic = critic.join.through.as_ref().unwrap();
    let from_movie = movie.join.through.as_ref().unwrap();

    assert_eq!(from_critic.from, from_movie.to);
    assert_eq!(from_critic.to, from_movie.from);
    assert_eq!(from_critic.extra, vec!["stars"]);
    assert_eq!(compiled.through_model(critic).unwrap().model_name, "Review");
    assert_eq!(compiled.relation_target(movie).unwrap().table_name, "critic");

    // Both directions and both fk fields collapse into two constraints.
    assert_eq!(compiled.plan.foreign_keys_of("review").len(), 2);
    assert_eq!(compiled.plan.foreign_keys.len(), 2);
}

#[tokio::test]
async fn test_many_to_many_disagreement() {
    let through = json!({ "table": "review", "from": "criticId", "to": "movieId" });
    let err = compile(movies(through)).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Schema(SchemaError::ThroughTableMismatch { .. })
    ));
}

#[tokio::test]
async fn test_second_join_table_on_one_side() {
    let through = json!({ "table": "review", "from": "movieId", "to": "criticId" });
    let mut project = movies(through);
    project["tables"][0]["fields"]
        .as_array_mut()
        .unwrap()
        .push(json!({
            "name": "favorites",
            "type": "relation",
            "table": "movie",
            "kind": "ManyToMany",
            "through": { "table": "favorite", "from": "criticId", "to": "movieId" }
        }));
    project["tables"].as_array_mut().unwrap().push(json!({
        "name": "favorite",
        "modelName": "Favorite",
        "fields": [
            { "name": "criticId", "type": "fk", "table": "critic", "to": "id" },
            { "name": "movieId", "type": "fk", "table": "movie", "to": "id" }
        ]
    }));

    let compiled = compile(project).await.unwrap();
    let favorites = compiled.table_model("critic").unwrap().relation("favorites").unwrap();

    assert_eq!(compiled.through_model(favorites).unwrap().model_name, "Favorite");
    assert_eq!(compiled.plan.foreign_keys_of("favorite").len(), 2);
}

#[tokio::test]
async fn test_composite_primary_key() {
    let through = json!({ "table": "review", "from": "movieId", "to": "criticId" });
    let compiled = compile(movies(through)).await.unwrap();
    let review = compiled.plan.table("review").unwrap();

    assert_eq!(
        review.composite_primary(),
        Some(&["criticId".to_string(), "movieId".to_string()][..])
    );
    assert!(review.columns().all(|c| !c.is_primary()));
    assert!(review.column("id").is_none());

    let model = compiled.table_model("review").unwrap();
    assert_eq!(model.id_columns, vec!["criticId", "movieId"]);
    assert!(model.json_schema.is_required("criticId"));
    assert!(model.json_schema.is_required("movieId"));
}

#[tokio::test]
async fn test_unknown_field_kind() {
    let err = compile(json!({
        "tables": [{ "name": "t", "modelName": "T", "fields": [{ "name": "x", "type": "uuid" }] }]
    }))
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        Error::Schema(SchemaError::UnknownFieldKind { ref kind, .. }) if kind == "uuid"
    ));
}

#[tokio::test]
async fn test_file_fragments() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("address.json"),
        json!({
            "type": "object",
            "properties": { "city": { "$ref": "#/definitions/name" } },
            "definitions": { "name": { "type": "string" } }
        })
        .to_string(),
    )
    .unwrap();

    let source = SchemaSource::from_json(
        &json!({
            "tables": [{
                "name": "person",
                "modelName": "Person",
                "fields": [
                    { "name": "home", "type": "json", "ref": "address.json" },
                    { "name": "work", "type": "json", "ref": "address.json", "nullable": true }
                ]
            }]
        })
        .to_string(),
    )
    .unwrap();

    let compiled = Compiler::new(FileFragmentResolver::new(dir.path()), CompilerConfig::default())
        .compile(&source)
        .await
        .unwrap();
    let schema = serde_json::to_value(&compiled.models[0].json_schema).unwrap();

    assert_eq!(
        schema["properties"]["home"]["properties"]["city"],
        json!({ "type": "string" })
    );
    assert_eq!(schema["required"], json!(["home"]));
}

#[tokio::test]
async fn test_hooks_through_descriptor() {
    let compiled = compile(shop()).await.unwrap();
    let order = compiled.table_model("order").unwrap();

    let mut record = Record::new();
    record.insert("customerId".to_string(), Value::Integer(7));
    record.insert("placedOn".to_string(), Value::from("2024-02-29T23:00:00.000Z"));
    record.insert("created_at".to_string(), Value::from("2024-01-01 00:00:00"));
    order.before_update(&mut record).unwrap();

    let stored = order.format_for_storage(record).unwrap();
    assert_eq!(stored["placedOn"], Value::from("2024-02-29"));
    assert!(!stored.contains_key("created_at"));
    let Value::String(updated) = &stored["updated_at"] else {
        panic!("updated_at not stamped");
    };
    assert_eq!(updated.len(), "2024-01-01 00:00:00".len());
}

#[tokio::test]
async fn test_apply_sql_script() {
    let compiled = compile(shop()).await.unwrap();
    let mut driver = SqlScriptDriver::new();
    apply(&compiled.plan, &mut driver).await.unwrap();

    let statements = driver.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].starts_with("create table `customer`"));
    assert!(statements[1].contains("`customerId` int unsigned not null"));
    assert_eq!(
        statements[2],
        "alter table `order` add constraint `order_customerId_foreign` foreign key (`customerId`) \
         references `customer` (`id`) on delete cascade"
    );
}

#[derive(Default)]
struct RecordingDriver {
    calls: Vec<String>,
    reject: Option<String>,
}

#[async_trait]
impl StorageDriver for RecordingDriver {
    async fn create_table(&mut self, plan: &TablePlan) -> Result<(), BoxError> {
        if self.reject.as_deref() == Some(plan.table.as_str()) {
            return Err("permission denied".into());
        }
        self.calls.push(format!("create {}", plan.table));
        Ok(())
    }

    async fn add_foreign_key(&mut self, op: &ForeignKeyOp) -> Result<(), BoxError> {
        self.calls.push(format!("fk {}", op.constraint_name()));
        Ok(())
    }
}

#[tokio::test]
async fn test_apply_order_and_failure() {
    let through = json!({ "table": "review", "from": "movieId", "to": "criticId" });
    let compiled = compile(movies(through)).await.unwrap();

    let mut driver = RecordingDriver::default();
    apply(&compiled.plan, &mut driver).await.unwrap();
    assert_eq!(
        driver.calls,
        vec![
            "create critic",
            "create movie",
            "create review",
            "fk review_criticId_foreign",
            "fk review_movieId_foreign",
        ]
    );

    let mut failing = RecordingDriver {
        reject: Some("movie".to_string()),
        ..Default::default()
    };
    let err = apply(&compiled.plan, &mut failing).await.unwrap_err();
    let Error::Storage(storage) = err else {
        panic!("expected a storage error");
    };
    assert_eq!(storage.table, "movie");
    assert_eq!(storage.operation, "create table");
    assert_eq!(failing.calls, vec!["create critic"]);
}
