// src/models/mod.rs
pub mod session;

pub use session::*;
