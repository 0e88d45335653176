//! SQL-callable functions: an explicit registration table and the definer that
//! binds its entries as aliases on a data source.

pub mod string;

use std::error::Error as StdError;
use std::fmt;
use std::panic::RefUnwindSafe;
use std::sync::Arc;

use db_infra::{with_data_source, DataSourceManager, ScalarFn};
use rusqlite::types::Value;
use tracing::{debug, warn};

use crate::error::FixtureError;

pub use string::string_functions;

/// Error raised from inside a function body; surfaces as a SQL error.
pub type FunctionError = Box<dyn StdError + Send + Sync + 'static>;

/// Arity of variadic functions.
pub const VARIADIC: i32 = -1;

pub enum FunctionBody {
    /// Returns a value; registered as a SQL alias
    Scalar(ScalarFn),
    /// Returns nothing; not a valid SQL function, skipped at registration
    Procedure(Arc<dyn Fn(&[Value]) + Send + Sync>),
}

pub struct SqlFunction {
    pub name: String,
    pub arity: i32,
    pub body: FunctionBody,
}

impl SqlFunction {
    /// Name the alias is registered under.
    pub fn alias(&self) -> String {
        self.name.to_uppercase()
    }

    pub fn returns_value(&self) -> bool {
        matches!(self.body, FunctionBody::Scalar(_))
    }
}

impl fmt::Debug for SqlFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("returns_value", &self.returns_value())
            .finish()
    }
}

/// Registration table of functions owned by one container (`owner`).
#[derive(Debug)]
pub struct FunctionSet {
    owner: String,
    functions: Vec<SqlFunction>,
}

impl FunctionSet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            functions: Vec::new(),
        }
    }

    /// Add a value-returning function. `arity` is the argument count, or
    /// [`VARIADIC`].
    pub fn scalar<F>(mut self, name: impl Into<String>, arity: i32, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + RefUnwindSafe + 'static,
    {
        let body: ScalarFn = Arc::new(move |args: &[Value]| {
            body(args).map_err(rusqlite::Error::UserFunctionError)
        });
        self.functions.push(SqlFunction {
            name: name.into(),
            arity,
            body: FunctionBody::Scalar(body),
        });
        self
    }

    /// Add a function that returns nothing.
    pub fn procedure<F>(mut self, name: impl Into<String>, arity: i32, body: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.functions.push(SqlFunction {
            name: name.into(),
            arity,
            body: FunctionBody::Procedure(Arc::new(body)),
        });
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn iter(&self) -> impl Iterator<Item = &SqlFunction> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Registers [`FunctionSet`] entries as SQL aliases.
pub struct FunctionDefiner {
    manager: Arc<dyn DataSourceManager>,
}

impl FunctionDefiner {
    pub fn new(manager: Arc<dyn DataSourceManager>) -> Self {
        Self { manager }
    }

    /// Define every value-returning entry; procedures are skipped with a
    /// warning. Returns the aliases newly defined by this call.
    pub fn define(&self, data_source: &str, set: &FunctionSet) -> Result<Vec<String>, FixtureError> {
        let mut defined = Vec::new();

        for function in set.iter() {
            let body = match &function.body {
                FunctionBody::Scalar(body) => body.clone(),
                FunctionBody::Procedure(_) => {
                    warn!(
                        owner = set.owner(),
                        function = %function.name,
                        "function returns no value, ignored"
                    );
                    continue;
                }
            };

            let alias = function.alias();
            let created = with_data_source(self.manager.as_ref(), data_source, |source| {
                source.define_alias(&alias, function.arity, body)
            })?;

            if created {
                debug!(data_source, owner = set.owner(), alias = %alias, "function defined");
                defined.push(alias);
            }
        }

        Ok(defined)
    }
}
