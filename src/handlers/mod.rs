// src/handlers/mod.rs
pub mod media;
pub mod session;
pub mod ui;
