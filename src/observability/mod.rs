// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured log messages.
//!
//! Every diagnostic event the crate emits is a small struct with a `Display`
//! implementation and a [`messages::StructuredLog`] implementation that picks
//! the level and the structured fields. Call sites build the struct and call
//! `.log()`; no message text lives at the call site.
//!
//! Messages are grouped by subsystem:
//! * `messages::validation` - chain assembly and validation
//! * `messages::engine` - executor lifecycle
//! * `messages::step` - individual step execution
//!
//! ```rust
//! use stepchain::observability::messages::step::StepSkipped;
//! use stepchain::observability::messages::StructuredLog;
//!
//! StepSkipped {
//!     step_id: "package",
//!     upstream: "compile",
//! }
//! .log();
//! ```

pub mod messages;
