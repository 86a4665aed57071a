pub mod access;
pub mod config;
pub mod mime_type;
pub mod model;
pub mod view;
