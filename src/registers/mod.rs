//! Register definitions for the SX126x radio
//! Generated from DS_SX1261-2_V1.2.pdf datasheet

mod packet;
mod rf;

pub use packet::*;
pub use rf::*;
