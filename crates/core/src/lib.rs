//! Core library for stickerbot
//!
//! This crate implements the **Functional Core** of the stickerbot
//! application, following the Functional Core - Imperative Shell
//! architectural pattern.
//!
//! # Architecture Overview
//!
//! The stickerbot project uses a two-crate split to enforce separation of
//! concerns:
//!
//! - **`stickerbot_core`** (this crate): Pure transformation functions with
//!   zero I/O
//! - **`stickerbot`**: I/O operations and orchestration (the Imperative
//!   Shell)
//!
//! All functions here are deterministic: the same vehicle fields and option
//! groups always produce the same ad text, with no filesystem, network, or
//! subprocess access.  PDF parsing itself lives in the `sticker` crate; this
//! crate only consumes its output.
//!
//! # Module Organization
//!
//! - [`ad`]: Facebook ad assembly from vehicle fields and option groups
//! - [`hashtags`]: Hashtag selection keyed on the vehicle headline

pub mod ad;
pub mod hashtags;

pub use ad::{build_ad, VehicleFields};
pub use hashtags::choose_hashtags;
