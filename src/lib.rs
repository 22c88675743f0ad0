pub mod config;
pub mod data_gateway;
pub mod job_queue;
pub mod mail;
pub mod server;
pub mod sqlite_persistence;
pub mod tenant;
