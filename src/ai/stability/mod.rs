mod client;
pub mod endpoint;
mod image;
pub mod types;

pub use endpoint::{select_endpoint, Endpoint};
pub use image::StabilityImageClient;
