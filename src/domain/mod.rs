pub mod label;
pub mod merge;
pub mod models;
pub mod stats;
pub mod timer;
