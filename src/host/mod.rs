pub mod element;
pub mod events;
pub mod protocol;
pub mod server;
pub mod view;
