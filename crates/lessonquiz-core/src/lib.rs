//! lessonquiz-core: quiz sessions, grading, and attempt policy.
//!
//! This crate holds the data model shared by every lessonquiz crate, the
//! deterministic grading engine, the client-side session state machine with
//! its monotonic countdown, and an in-process grading service backed by an
//! in-memory question bank and attempt store.

pub mod bank;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod report;
pub mod service;
pub mod session;
pub mod store;
pub mod timer;
pub mod traits;
