//! `SchemaOps` for the object-store kind: containers come straight from the
//! configured `TableDef` list, and each container's field list is inferred
//! from the first matching data file rather than read off a catalog (spec
//! §4.7).

use crate::config::{FileFormat, TableDef};
use crate::listing::list_table_files;
use async_trait::async_trait;
use fabric_connector::adapter::{Container, SchemaOps, UnifiedSchema};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::schema::Field;
use fabric_types::type_registry::TypeConversionRegistry;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use std::sync::Arc;

pub struct ObjectStoreSchemaOps {
    pub store: Arc<dyn ObjectStore>,
    pub root: StorePath,
    pub database_id: String,
    pub tables: Vec<TableDef>,
    pub types: Arc<TypeConversionRegistry>,
}

#[async_trait]
impl SchemaOps for ObjectStoreSchemaOps {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let mut schema = UnifiedSchema::new(self.database_id.clone(), Kind::ObjectStore);
        for table in &self.tables {
            schema.containers.push(self.get_container(&table.name, ctx).await?);
        }
        schema.canonicalize();
        Ok(schema)
    }

    async fn create_structure(&self, _schema: &UnifiedSchema, _ctx: &OpContext) -> Result<(), FabricError> {
        Err(FabricError::unsupported("schema.create_structure", "object_store"))
    }

    async fn list_containers(&self, _ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        let table = self
            .tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| FabricError::NotFound { resource: name.to_string() })?;

        let files = list_table_files(self.store.as_ref(), &self.root, table, ctx).await?;
        let mut container = Container::new(table.name.clone());
        let Some(first) = files.first() else {
            return Ok(container);
        };
        let bytes = ctx
            .run(self.store.get(first))
            .await?
            .map_err(FabricError::internal)?
            .bytes()
            .await
            .map_err(FabricError::internal)?;

        let columns = match table.format {
            FileFormat::Csv => crate::row::csv_header(&bytes)?.into_iter().map(|name| (name, "string")).collect(),
            FileFormat::Parquet => crate::row::parquet_schema(bytes)?,
        };
        for (column_name, native) in columns {
            let (unified_type, _info) = self.types.native(Kind::ObjectStore, native)?;
            let mut field = Field::new(column_name, unified_type, true);
            field.native_type = Some(native.to_string());
            container.fields.push(field);
        }
        Ok(container)
    }
}
