//! Terminal player for the built-in demo story

pub mod demo;
pub mod play;
pub mod view_state;
