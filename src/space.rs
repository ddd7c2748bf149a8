// src/space.rs
//! Grid geometry: axis metadata, index codec and deposition kernels.

pub mod axis;
pub mod codec;
pub mod kernel;
