pub mod config;
pub mod logger;
pub mod matcher;
pub mod remote;
pub mod selection;
pub mod store;
