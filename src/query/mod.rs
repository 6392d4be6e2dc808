//! Query layer over the store

pub mod images;

pub use images::ImageSearch;
