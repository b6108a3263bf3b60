//! Core types for Dirauth

mod identity;

pub use identity::*;
