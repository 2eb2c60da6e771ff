pub mod gifts;
pub mod users;

pub use gifts as gift_entity;
pub use users as user_entity;
