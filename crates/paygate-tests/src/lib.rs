//! Test support for paygate integration tests.

pub mod helpers;
