pub mod bootstrap;
pub mod commands;
pub mod sync;
pub mod ticker;
