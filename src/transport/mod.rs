//! Concrete upload transports

pub mod local;

pub use local::LocalDirStrategy;
