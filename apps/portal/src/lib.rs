pub mod api_client;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod errors;
pub mod interview;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod storage;
pub mod view;

#[cfg(test)]
mod test_support;
