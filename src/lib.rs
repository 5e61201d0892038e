//! Joint angles from 33-point body pose detections.

pub mod angle;
pub mod detection;
pub mod error;
pub mod frame;
pub mod landmark;
pub mod limb;
pub mod overlay;

pub use error::Error;
