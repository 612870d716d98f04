//! Request handlers.

pub mod booking;
pub mod event;
pub mod health;
pub mod ws;
