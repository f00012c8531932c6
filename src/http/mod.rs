pub mod client;
pub mod method;
pub mod request;
pub mod response;

pub use client::{ApiClient, ClientOptions, RetryPolicy};
pub use method::HttpMethod;
pub use response::RawResponse;
