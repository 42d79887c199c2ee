#![cfg_attr(not(test), no_std)]

//! daikin_s21
//!
//! Simulator for the air conditioner side of the Daikin S21 serial protocol,
//! for developing and testing controllers (Faikin, BRP069B41 and similar)
//! without a real unit attached. Command semantics are reverse engineered;
//! the replies nobody understands yet are reproduced byte for byte from real
//! units.
//!
//! The library is `no_std` and does not touch a serial device itself. S21
//! runs at 2400 baud, 8 bits per byte, even parity with 2 stop bits (2400 8E2).
//! Configure your port as such and hand it to [`S21Device`] as anything
//! implementing `embedded_hal::serial::{Read, Write}`. The `s21-sim` binary
//! does this for a host serial port.
//!
//! ## General Usage
//!
//! Answer a single frame:
//!
//! ```
//! use daikin_s21::dispatch::{dispatch, Reply};
//! use daikin_s21::protocol::Frame;
//! use daikin_s21::unit::{UnitConfig, UnitState};
//!
//! let mut unit = UnitState::new(UnitConfig::default()).unwrap();
//!
//! // STX 'R' 'H' checksum ETX: ask for the room temperature
//! let request = Frame::from_bytes(&[0x02, 0x52, 0x48, 0x9a, 0x03]).unwrap();
//! assert!(request.validate());
//!
//! match dispatch(&request, &mut unit) {
//!     // +24.5 C, spelled backwards
//!     Reply::Response(frame) => assert_eq!(frame.body(), b"SH542+"),
//!     other => panic!("unexpected reply {:?}", other),
//! }
//! ```
//!
//! Or serve a whole channel, one transaction at a time:
//!
//! ```ignore
//! let mut device = S21Device::new(serial, unit);
//! loop {
//!     device.poll()?;
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod interface;
pub mod protocol;
pub mod unit;

pub use error::{ChannelError, ConfigError, EncodingError, FrameError};
pub use interface::{Handshake, S21Device};
pub use unit::{UnitConfig, UnitState};
