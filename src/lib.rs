// src/lib.rs

//! Best-post crawler library
//!
//! Collects real-time and daily best posts from Korean community sites,
//! normalizes their bodies into text/image/video segments and stores them
//! with downloaded media and OCR text.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sites;
pub mod storage;
pub mod utils;
