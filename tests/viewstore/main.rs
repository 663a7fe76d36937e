//! Integration tests for the viewstore facade

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod config;
mod designs;
mod documents;
mod loader;
mod locks;
mod views;
