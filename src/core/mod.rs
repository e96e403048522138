//! Core crop building blocks: pixel buffers, integer geometry, component
//! parameters, and the processing components. These are internal primitives
//! consumed by the high-level `api` module.
pub mod buffer;
pub mod geometry;
pub mod params;
pub mod processing;
