//! Integration Tests Module
//!
//! End-to-end tests for the Visa Advisor service. A scripted in-memory
//! backend stands in for the reasoning provider.

// Shared fixtures and the scripted backend
mod support;

// Research, fan-in analysis, advisory and timeout pipelines
mod orchestrator_test;

// Advisory stream and refinement
mod advisory_test;

// Partial-output extraction over a live stream
mod extractor_test;

// HTTP routes, validation and SSE framing
mod server_test;
