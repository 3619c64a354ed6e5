pub mod upload_locks;
pub mod validation;
