//! Domain model for the verimail email verification client.
//!
//! Everything in this crate is plain data plus the small codecs the wire format
//! needs; the async client lives in `verimail-sdk`.

pub mod domain;
pub mod error;
pub mod timespan;

pub use domain::*;
pub use error::*;
pub use timespan::{format_time_span, parse_time_span};
