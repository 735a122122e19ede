//! Pipeline stages for screenshot-to-workflow generation.
//!
//! Each submodule implements exactly one transformation step and is a pure
//! function of its inputs, so every stage is testable without a provider.
//! The network call between `encode` and `decode` lives in
//! [`crate::providers`].
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ encode ──▶ (provider) ──▶ decode
//! (sniffing)   (parts)     (raw text)    (schema)
//! ```
//!
//! 1. [`validate`]: reject anything that is not a genuine, size-bounded image
//! 2. [`encode`]: build the ordered text/image parts of a `VisionRequest`
//! 3. [`decode`]: parse the model's reply and enforce the workflow schema

pub mod decode;
pub mod encode;
pub mod validate;
