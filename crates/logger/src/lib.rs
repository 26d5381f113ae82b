//! Tracing subscriber setup shared by the apimon binaries.

mod subscriber;

pub use subscriber::init_with_level;
