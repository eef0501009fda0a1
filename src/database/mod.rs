pub mod handlers;
pub mod manager;
pub mod schema;
pub mod store;

pub use handlers::run_database_handler;
pub use manager::DatabaseManager;
pub use store::DatabaseStore;
