pub mod completeness;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod part_store;
pub mod reassembler;
pub mod staging;
pub mod sweeper;
