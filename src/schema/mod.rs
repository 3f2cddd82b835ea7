//! Inbound raw event schema
//!
//! This module defines the tagged report envelope delivered by the device
//! connection layer and the closed set of payload shapes behind each tag.

mod raw_event;

pub use raw_event::*;
