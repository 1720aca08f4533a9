//! Pluct Transcribe - background job orchestrator for video transcription
//!
//! This crate drives one transcription request through the Pluct Business
//! Engine's multi-stage workflow (health check, credit balance check,
//! token vending, submission, status polling) until a transcript is
//! produced or the request definitively fails.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Job record and state machine, failure taxonomy, value objects
//! - **Application**: The orchestration core (step executor, retry policy,
//!   status poller, progress reporter, dedup registry, job service) and
//!   port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (HTTP Business Engine
//!   client, XDG config store)
//! - **CLI**: Command-line interface for submitting a URL and watching
//!   its progress
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
