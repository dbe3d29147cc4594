//! # siftX API
//!
//! REST serving layer for the siftX dataset search service.

mod rest;

pub use rest::RestApi;
