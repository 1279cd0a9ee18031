// ============================================
// src/lib.rs
// JERN: 単語の翻字タイピング練習
// ============================================

pub mod app;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod narrator;
pub mod pack;
pub mod scheduler;
pub mod session;
pub mod transliterate;
pub mod typing;
pub mod words;

pub use error::{JernError, Result};
