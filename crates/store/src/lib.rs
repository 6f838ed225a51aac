//! Storage layer for the hybrid retrieval engine
//!
//! Provides SurrealDB integration: the chunk store plus persistence of the
//! built graph/tree artifacts. The retrieval core only reads chunks from
//! here; artifact persistence round-trips losslessly through JSON.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::{DbError, Result};
pub use repository::Repository;

use std::path::Path;
use surrealdb::engine::local::{Db, Mem};
#[cfg(feature = "rocksdb")]
use surrealdb::engine::local::RocksDb;
use surrealdb::Surreal;

/// Database connection type
pub type DbConnection = Surreal<Db>;

/// Initialize database with RocksDB (persistent)
#[cfg(feature = "rocksdb")]
pub async fn init_persistent(path: impl AsRef<Path>) -> Result<DbConnection> {
    let db = Surreal::new::<RocksDb>(path.as_ref()).await?;
    setup_database(&db).await?;
    Ok(db)
}

/// Initialize database in-memory (for testing)
pub async fn init_memory() -> Result<DbConnection> {
    let db = Surreal::new::<Mem>(()).await?;
    setup_database(&db).await?;
    Ok(db)
}

/// Setup database namespace, database, and schema
async fn setup_database(db: &DbConnection) -> Result<()> {
    db.use_ns("hyrag").use_db("corpus").await?;
    schema::initialize_schema(db).await?;
    Ok(())
}
