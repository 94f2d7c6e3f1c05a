//! outage-bot - A Telegram bot that alerts subscribers about outages of popular services.
//!
//! This crate provides:
//! - Polling of outage-report pages and threshold based outage detection
//! - Fanout of outage alerts and admin broadcasts to every subscriber
//! - Subscriber registration with referral tracking and statistics

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod repository;
pub mod service;
pub mod source;
pub mod subscriber;
pub mod task;
pub mod transport;
pub mod util;
