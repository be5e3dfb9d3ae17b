//! # mockchat-shared
//!
//! Data model, validation rules and pure state transitions shared by the
//! persistence layer (`mockchat-store`) and the coordinator
//! (`mockchat-client`).

pub mod constants;
pub mod transitions;
pub mod types;
pub mod validation;

pub use types::*;
