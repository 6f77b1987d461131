#![deny(clippy::all)]

pub use crate::config::*;
pub use crate::error::*;
pub use crate::model::*;

pub mod browser;
mod config;
mod error;
pub mod html;
mod model;
pub mod scraper;
pub mod storage;
