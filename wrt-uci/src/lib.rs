//! # wrt-uci
//!
//! Decoder for the text produced by `uci show` on OpenWrt devices.
//!
//! A dump is a flat list of facts, one per line:
//!
//! ```text
//! network.wan=interface
//! network.wan.proto='dhcp'
//! network.@device[0]=device
//! network.@device[0].name='eth1'
//! ```
//!
//! Decoding is a single left-to-right fold over the lines:
//!
//!   line text ──classify──▶ [`Line`] ──apply──▶ [`DecodeState`] ──finish──▶ [`Document`]
//!
//! - [`line`] turns one line into a declaration, an assignment, or nothing.
//! - [`decoder`] carries the active section context and builds the containers.
//! - [`document`] is the output tree: package → kind → section → option.
//!
//! Decoding never fails. Lines that match neither grammar are skipped.

pub mod decoder;
pub mod document;
pub mod line;

pub use decoder::{decode, decode_with, DecodeOptions, DecodeState, IndexPlacement, SectionContext};
pub use document::{Document, Package, Section, SectionGroup};
pub use line::{classify, Line, SectionId};
