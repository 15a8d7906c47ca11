//! Feedback loop for column mapping.
//!
//! # Features
//!
//! - **Feedback store**: append-only log of binary ratings and column fixes
//!   ([`FeedbackStore`])
//! - **Pattern analysis**: rating clusters, widespread negativity and
//!   recurring corrections ([`PatternAnalyzer`])
//! - **Learning**: recurring corrections become few-shot examples registered
//!   into an [`ExamplePool`] ([`Learner`])

pub mod analyzer;
pub mod error;
pub mod learner;
pub mod pool;
pub mod repository;
pub mod store;

pub use analyzer::{PatternAnalyzer, detect_patterns, top_corrections, window_start};
pub use error::{FeedbackError, Result};
pub use learner::{Learner, LearningReport, build_examples};
pub use pool::{ExamplePool, InMemoryExamplePool};
pub use repository::ExampleRepository;
pub use store::{FeedbackStore, NewFeedback, recent_trend};
