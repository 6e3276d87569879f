pub mod config;
pub mod credential_store;
pub mod error;
pub mod local_repository;
pub mod logging;
pub mod remote_file_client;
pub mod storage;
pub mod sync_state_repository;
