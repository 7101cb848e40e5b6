//! SD protocol engine (C2): command framing, CRC7, init state machine, and
//! single/multi-block sector I/O over SPI.

pub mod card;
pub mod command;
pub mod registers;

pub use card::{CardInfo, CardType, SdCard};
pub use registers::{Cid, Csd};
