//! Business Engine adapters

pub mod http;

pub use http::HttpBusinessEngine;
