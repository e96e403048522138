//! The five detection and fitting components. Each module takes a normalized
//! buffer plus its params struct and returns plain geometry; none of them
//! touch the filesystem.
pub mod aspect_fit;
pub mod band_scan;
pub mod banner;
pub mod border_grow;
pub mod subject_bounds;
