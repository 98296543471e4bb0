//! Core state layer
//!
//! Pure, synchronous feed logic in the Elm style:
//! - Messages in, commands out
//! - Feed and mutation state
//! - Ports implemented by the outer layers

pub mod cmd;
pub mod msg;
pub mod ports;
pub mod state;
