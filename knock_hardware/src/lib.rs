pub mod error;
pub mod mcp3008;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use sim::SimShield;
