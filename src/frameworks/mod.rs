// Frameworks layer: environment configuration and the command-line bootstrap.

pub mod cli;
pub mod config;
