pub mod anki;
pub mod config;
pub mod console;
pub mod core;
pub mod llm;
pub mod persistence;
pub mod render;
pub mod session;
pub mod tts;

#[cfg(test)]
mod testing;

pub use crate::core::{
    Card,
    CardError,
    CardKey,
};
