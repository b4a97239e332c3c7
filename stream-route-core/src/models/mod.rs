pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod role_table;
pub mod route;
pub mod stream;
