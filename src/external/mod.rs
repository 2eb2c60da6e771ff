pub mod imgur;

pub use imgur::*;
