//! Output module
//!
//! Streams animation frames to browser renderers over HTTP/SSE.

pub mod sse;
