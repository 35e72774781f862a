//! Streaming
//!
//! ```text
//!  LlmProvider::complete_stream ──▶ EventStream ──▶ StreamResponse::next()
//!                                                     │  stream.on_event
//!                                                     │  accumulate
//!                                                     ▼
//!                                     stream_end / exhausted ──▶ stream.after_complete
//! ```

mod event;
mod response;
mod sse;

pub use event::{Artifact, Citation, StreamEvent, StreamEventKind};
pub use response::{EventStream, StreamError, StreamResponse, StreamSummary, StreamToolCall};
pub use sse::SSE_HEADERS;
