pub mod hooks;
pub mod tags;
