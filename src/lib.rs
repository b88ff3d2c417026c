pub mod access;
pub mod identity;
pub mod redirect;
pub mod gate;
pub mod directory;
pub mod config;
pub mod error;
pub mod server;
