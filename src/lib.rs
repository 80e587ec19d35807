//! Concentration clustering and map tooling for out-of-school-children
//! (OOSC) education program data.
//!
//! Entry records dumped from the program backend are grouped into
//! concentration circles (one per anchor site and institution type),
//! summarized into dashboard statistics, rendered as map tiles, and served
//! over an HTTP API.

pub mod clustering;
pub mod config;
pub mod data;
pub mod export;
pub mod render;
pub mod server;
pub mod stats;
pub mod types;
