// Library module to expose the corpus generator to the binaries and tests

pub mod catalog;
pub mod config;
pub mod manifest;
pub mod models;
pub mod writer;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod writer_tests;
