pub mod boundary;
pub mod config;
pub mod contact;
pub mod domain;
pub mod error;
pub mod export;
pub mod geometry;
pub mod grid;
pub mod math;
pub mod tessellation;
pub mod voxelize;

pub use error::{EmvoxError, Result};
