//! Headless driver for the CSIV trust engine.
//!
//! Generates a tower field around a wandering observer and runs the trust
//! engine on it tick by tick, optionally emitting SIB broadcasts.

pub mod sib;
pub mod sim;
pub mod world;

pub use sib::Sib;
pub use sim::{Simulation, TickReport};
pub use world::World;
