pub mod dedup;
pub mod feed;
pub mod projector;
pub mod types;
