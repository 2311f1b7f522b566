#![allow(dead_code)]
//! Shared fixtures for integration tests.

pub mod providers;
pub mod store;
