//! `SchemaOps` for MongoDB (spec §4.7). Collections carry no catalog, so
//! `discover` samples a bounded number of documents per collection and
//! widens the inferred shape across the sample, rather than reading DDL.

use async_trait::async_trait;
use bson::Bson;
use fabric_connector::adapter::{Container, SchemaOps, UnifiedSchema};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::schema::{Constraint, Field};
use fabric_types::type_registry::TypeConversionRegistry;
use futures::TryStreamExt;
use mongodb::Client;
use std::sync::Arc;

const SAMPLE_SIZE: i64 = 100;

pub struct MongoSchemaOps {
    pub client: Client,
    pub database_id: String,
    pub types: Arc<TypeConversionRegistry>,
}

#[async_trait]
impl SchemaOps for MongoSchemaOps {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let db = self.client.database(&self.database_id);
        let names = ctx
            .run(db.list_collection_names(None))
            .await?
            .map_err(FabricError::internal)?;

        let mut schema = UnifiedSchema::new(self.database_id.clone(), Kind::MongoDb);
        for name in names {
            let container = self.discover_collection(&name, ctx).await?;
            schema.containers.push(container);
        }
        schema.canonicalize();
        Ok(schema)
    }

    async fn create_structure(&self, schema: &UnifiedSchema, ctx: &OpContext) -> Result<(), FabricError> {
        let db = self.client.database(&self.database_id);
        for container in &schema.containers {
            let db = db.clone();
            let name = container.name.clone();
            ctx.run(async move { db.create_collection(&name, None).await })
                .await?
                .map_err(FabricError::internal)?;
        }
        Ok(())
    }

    async fn list_containers(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        let db = self.client.database(&self.database_id);
        ctx.run(db.list_collection_names(None)).await?.map_err(FabricError::internal)
    }

    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        self.discover_collection(name, ctx).await
    }
}

impl MongoSchemaOps {
    async fn discover_collection(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        let collection = self.client.database(&self.database_id).collection::<bson::Document>(name);
        let options = mongodb::options::FindOptions::builder().limit(SAMPLE_SIZE).build();
        let collection_for_run = collection.clone();
        let mut cursor = ctx
            .run(async move { collection_for_run.find(None, options).await })
            .await?
            .map_err(FabricError::internal)?;

        let mut container = Container::new(name.to_string());
        while let Some(doc) = ctx.run(cursor.try_next()).await?.map_err(FabricError::internal)? {
            for (key, value) in doc {
                let native = native_name(&value);
                let (unified_type, _info) = self.types.native(Kind::MongoDb, native)?;
                match container.fields.iter_mut().find(|f| f.name == key) {
                    Some(field) => field.nullable = field.nullable || matches!(value, Bson::Null),
                    None => {
                        let mut field = Field::new(key.clone(), unified_type, matches!(value, Bson::Null));
                        field.native_type = Some(native.to_string());
                        container.fields.push(field);
                    }
                }
            }
        }
        if container.fields.iter().any(|f| f.name == "_id") {
            container.constraints.push(Constraint::PrimaryKey { fields: vec!["_id".to_string()] });
        }
        Ok(container)
    }
}

fn native_name(value: &Bson) -> &'static str {
    match value {
        Bson::Boolean(_) => "bool",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::Double(_) => "double",
        Bson::Decimal128(_) => "decimal",
        Bson::String(_) => "string",
        Bson::Binary(_) => "binData",
        Bson::DateTime(_) => "date",
        Bson::ObjectId(_) => "objectId",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        _ => "string",
    }
}
