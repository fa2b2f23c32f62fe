//! medrec-adapter-postgres - PostgreSQL 适配器

mod audit_store;
mod connection;
mod error;
mod migration;
mod schema;

pub use audit_store::PostgresAuditStore;
pub use connection::*;
pub use error::map_sqlx_error;
pub use migration::*;
pub use schema::medrec_migrations;
