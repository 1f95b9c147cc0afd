// Library crate exposing modules for the binary and integration tests

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod parsers;
pub mod repository;
pub mod scanner;
pub mod scm;
pub mod util;
