// src/lib.rs

//! Trend Scheduler Library
//!
//! Crawls the hourly keyword rankings of Naver, Nate, Zum, Google and
//! Namuwiki, merges them into realtime, daily and weekly totals, and drives
//! the backend's keyword finalization and trend alarms.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod storage;
