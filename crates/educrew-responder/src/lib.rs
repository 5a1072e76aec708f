//! # Educrew Responder
//!
//! Access to the external text-generation service. Agents never talk to the
//! upstream directly: they share one [`RateLimitedClient`], which spaces calls
//! and retries throttled or failed requests according to a [`RetryPolicy`].

pub mod azure;
pub mod client;
pub mod error;
pub mod policy;
pub mod prompts;
pub mod responder;

pub use azure::{AzureOpenAiConfig, AzureOpenAiResponder};
pub use client::RateLimitedClient;
pub use error::ResponderError;
pub use policy::RetryPolicy;
pub use responder::{GenerationRequest, OfflineResponder, Responder};
