//! Background tasks.

pub mod outage_poller;
