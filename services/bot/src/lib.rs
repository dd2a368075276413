pub mod adapters;
pub mod config;
pub mod error;
pub mod polling;
pub mod web;
