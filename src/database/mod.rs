//! # Database Operations
//!
//! PostgreSQL connection management and schema bootstrap.
//!
//! - [`connection`] - Pool creation from configuration and health checks
//! - [`schema`] - Idempotent creation of the `tasks` table
//!
//! ```rust,no_run
//! use taskforge_core::config::TaskforgeConfig;
//! use taskforge_core::database::{ensure_schema, DatabaseConnection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TaskforgeConfig::load()?;
//! let db = DatabaseConnection::connect(&config.database).await?;
//! ensure_schema(db.pool()).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod schema;

pub use connection::DatabaseConnection;
pub use schema::ensure_schema;
