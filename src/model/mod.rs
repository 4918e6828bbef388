//! Domain models shared across handlers and the dispatcher.

pub mod reply;
