pub mod client;

pub use client::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse, UpstreamTransport};
