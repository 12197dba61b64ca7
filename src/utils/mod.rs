pub mod coerce;
pub mod data_path;
pub mod debounce;
pub mod merge;
pub mod text;
