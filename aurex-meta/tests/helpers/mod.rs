//! Test helper utilities
//!
//! Shared mocks and fixtures for aurex-meta integration tests. Test binaries
//! import from the submodules directly so each one only pulls in what it uses.
#![allow(dead_code)]

pub mod audio;
pub mod mock_services;
