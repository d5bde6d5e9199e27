//! Pipeline stages for page-to-Markdown reconstruction.
//!
//! Each submodule implements exactly one transformation step and is
//! testable on its own against plain model values.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ tables ───────────────┐
//! PageSource ├─▶ images ───────────────┼─▶ layout ──▶ PageMarkdown
//!            └─▶ normalize ─▶ classify ┘
//! ```
//!
//! 1. [`blocks`]        group raw spans into lines and blocks (engine side)
//! 2. [`table_detect`]  find tables from text alignment (engine side)
//! 3. [`tables`]        format detected grids as pipe tables
//! 4. [`images`]        decode, store and reference page images
//! 5. [`normalize`]     clean block text before classification
//! 6. [`classify`]      assign heading / paragraph / list / formula
//! 7. [`layout`]        order everything by position and render fragments
//! 8. [`page`]          run the stages above for one page
//!
//! [`vector`] and [`search`] serve the SVG render and text search entry
//! points; [`encode`] holds the PNG helpers they share with [`images`].

pub mod blocks;
pub mod classify;
pub mod encode;
pub mod images;
pub mod layout;
pub mod normalize;
pub mod page;
pub mod search;
pub mod table_detect;
pub mod tables;
pub mod vector;
