pub mod base;
pub mod configs;
pub mod factory;
pub mod gemini;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod mock;
