//! Query building, SQL compilation and entity materialization on top of an
//! external [`Executor`].
//!
//! ```ignore
//! let db = Db::builder()
//!     .registry(registry)
//!     .executor(executor)
//!     .build()?;
//!
//! let posts = db
//!     .get_many(db.select().select("post").from("Post", "post").load_relation_by_query("author"))
//!     .await?;
//! ```

pub mod db;
pub use db::{Db, IntoExpression};

mod loader;

pub mod materialize;
pub use materialize::Materializer;

pub use quarry_core::{
    async_trait,
    driver::{self, Capability, Dialect, Executor},
    schema::{self, Registry},
    stmt::{self, Entity, Key, LazyRelation, Record, Value},
    Error, Result,
};
pub use quarry_sql::Serializer;
