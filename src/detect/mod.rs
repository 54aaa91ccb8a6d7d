mod client;
mod result;

pub use client::DetectClient;
pub use result::{BoundingBox, Detection};
