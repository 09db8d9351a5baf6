pub mod client;
pub mod oauth;
pub mod poster;

pub use client::{PlatformApiError, PlatformClient, XClient};
pub use poster::post_reply;
