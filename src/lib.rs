pub mod app;
pub mod constants;
pub mod errors;
pub mod host;
pub mod managers;
pub mod model;
pub mod services;
pub mod utils;
