//! Bluetooth audio sink protocol helpers: SBC configuration, AVRCP
//! controller bookkeeping, and sink connection state.
//!
//! This crate is `no_std` by default; it only uses `core` + `heapless`.
//! The stack itself is reached through `platform::A2dpSink`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod avrcp;
pub mod sbc;
pub mod state;

pub use avrcp::{MediaAttribute, Notification, PassthroughKey, Title, TransactionLabels};
pub use sbc::{ChannelMode, SbcConfig};
pub use state::{BluetoothState, LinkState};
