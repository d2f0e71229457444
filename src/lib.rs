//! Anuvad - Dynamic Text Localization Engine
//!
//! Translates dynamically generated survey UI text on demand, without a
//! pre-built catalog: a session-wide cache, coalesced in-flight requests,
//! batched provider calls, negative caching of failures and debounced
//! re-rendering for views.

pub mod cli;
pub mod config;
pub mod error;
pub mod language;
pub mod cache;
pub mod inflight;
pub mod dictionary;
pub mod provider;
pub mod translator;
pub mod bulk;
pub mod extract;
pub mod orchestrator;
pub mod lookup;
pub mod localizer;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use cache::{CacheEntry, CacheKey, EntryState, TranslationCache, TranslationStore};
pub use config::Config;
pub use error::{AnuvadError, Result};
pub use language::Language;
pub use localizer::Localizer;
