pub mod common;
pub mod gift;
pub mod user;

pub use common::*;
pub use gift::*;
pub use user::*;
