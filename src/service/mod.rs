//! Long-lived services shared through application state.

pub mod error_tracking;
