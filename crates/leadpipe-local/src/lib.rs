//! Concrete implementations for the leadpipe extraction pipeline: a Google
//! HTML search backend, the result parser, the batched Gemini extraction
//! pass with its response sanitizer, a per-client rate limiter, and the
//! pipeline glue that runs one request end to end.

pub mod extract;
pub mod fetch;
pub mod gemini;
pub mod parse;
pub mod pipeline;
pub mod rate;
pub mod sanitize;

pub use extract::{BatchConfig, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, LEAD_PROMPT};
pub use fetch::GoogleSearchBackend;
pub use gemini::{GeminiFactory, GeminiModel};
pub use pipeline::LeadPipeline;
pub use rate::SlidingWindowLimiter;
