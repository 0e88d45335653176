//! Schema-definition documents and the DDL they translate to.

use sea_query::{Alias, ColumnDef, Index, SqliteQueryBuilder, Table};
use serde::Deserialize;

use crate::error::FixtureError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaDocument {
    pub entities: Vec<EntityDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityDef {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "long")]
    BigInt,
    #[serde(alias = "string")]
    Varchar,
    Text,
    #[serde(alias = "float", alias = "real")]
    Double,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    #[serde(alias = "datetime")]
    Timestamp,
    Blob,
}

fn default_nullable() -> bool {
    true
}

impl SchemaDocument {
    pub fn parse(text: &str) -> Result<Self, FixtureError> {
        let doc: SchemaDocument = serde_json::from_str(text)
            .map_err(|e| FixtureError::document(format!("invalid schema document: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), FixtureError> {
        for entity in &self.entities {
            if entity.columns.is_empty() {
                return Err(FixtureError::document(format!(
                    "table '{}' declares no columns",
                    entity.table
                )));
            }
            for index in &entity.indexes {
                if let Some(missing) = index
                    .columns
                    .iter()
                    .find(|c| entity.column(c).is_none())
                {
                    return Err(FixtureError::document(format!(
                        "index '{}' references unknown column '{}' on table '{}'",
                        index.name, missing, entity.table
                    )));
                }
            }
            let keys = entity.primary_key_columns().count();
            if let Some(col) = entity.columns.iter().find(|c| c.auto_increment) {
                let integer = matches!(col.kind, ColumnType::Int | ColumnType::BigInt);
                if keys != 1 || !col.primary_key || !integer {
                    return Err(FixtureError::document(format!(
                        "auto_increment column '{}' on table '{}' must be the single integer primary key",
                        col.name, entity.table
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.table.as_str())
    }

    /// DDL for every entity: the table first, then its indexes.
    pub fn to_statements(&self) -> Vec<String> {
        self.entities
            .iter()
            .flat_map(|entity| {
                std::iter::once(entity.create_table_sql()).chain(entity.create_index_sql())
            })
            .collect()
    }
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn create_table_sql(&self) -> String {
        let inline_key = self.primary_key_columns().count() == 1;

        let mut table = Table::create();
        table.table(Alias::new(&self.table)).if_not_exists();

        for spec in &self.columns {
            let mut def = ColumnDef::new(Alias::new(&spec.name));
            match (spec.kind, spec.length) {
                // SQLite only accepts AUTOINCREMENT on an `integer` key.
                (ColumnType::Int, _) | (ColumnType::BigInt, _) if spec.auto_increment => {
                    def.integer();
                }
                (ColumnType::Int, _) => {
                    def.integer();
                }
                (ColumnType::BigInt, _) => {
                    def.big_integer();
                }
                (ColumnType::Varchar, Some(len)) => {
                    def.string_len(len);
                }
                (ColumnType::Varchar, None) => {
                    def.string();
                }
                (ColumnType::Text, _) => {
                    def.text();
                }
                (ColumnType::Double, _) => {
                    def.double();
                }
                (ColumnType::Boolean, _) => {
                    def.boolean();
                }
                (ColumnType::Date, _) => {
                    def.date();
                }
                (ColumnType::Timestamp, _) => {
                    def.timestamp();
                }
                (ColumnType::Blob, _) => {
                    def.custom(Alias::new("blob"));
                }
            }
            if !spec.nullable || spec.primary_key {
                def.not_null();
            }
            if spec.primary_key && inline_key {
                def.primary_key();
                if spec.auto_increment {
                    def.auto_increment();
                }
            }
            table.col(&mut def);
        }

        if !inline_key {
            let mut key = Index::create();
            let mut any = false;
            for spec in self.primary_key_columns() {
                key.col(Alias::new(&spec.name));
                any = true;
            }
            if any {
                table.primary_key(&mut key);
            }
        }

        table.to_string(SqliteQueryBuilder)
    }

    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|spec| {
                let mut index = Index::create();
                index
                    .if_not_exists()
                    .name(&spec.name)
                    .table(Alias::new(&self.table));
                for column in &spec.columns {
                    index.col(Alias::new(column));
                }
                if spec.unique {
                    index.unique();
                }
                index.to_string(SqliteQueryBuilder)
            })
            .collect()
    }
}
