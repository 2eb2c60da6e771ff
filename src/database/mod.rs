pub mod connection;
pub mod repository;

pub use connection::{create_pool, run_migrations};
pub use repository::GiftRepository;
