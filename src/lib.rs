pub mod config;
pub mod tutor;
