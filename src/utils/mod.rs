pub mod client_id;
pub mod upload_token;

pub use client_id::{ensure_identity, is_well_formed_client_id};
pub use upload_token::{UploadToken, UploadTokenService};
