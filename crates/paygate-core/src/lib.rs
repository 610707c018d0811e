//! # paygate-core
//! Foundation types and collaborator traits for multi-wallet payments.

pub mod address;
pub mod amount;
pub mod constants;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod traits;
pub mod types;
