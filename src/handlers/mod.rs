pub mod gift;
pub mod identity;

pub use gift::gift_config;
pub use identity::identity_config;
