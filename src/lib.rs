//! # Task Tracker
//!
//! Assign tasks with deadlines, track completion and report on-time
//! performance.
//!
//! This library provides:
//! - Deadline evaluation in a fixed reference timezone
//! - Aggregated statistics, monthly series and spreadsheet export
//! - An HTTP API over a Supabase backend (or an in-memory store)
//! - Email notifications through Resend or a relay endpoint
//!
//! ## Data Flow
//!
//! ```text
//!   task store ──► DeadlinePolicy ──► report (stats / window / export)
//!        ▲                                   │
//!        │                                   ▼
//!     api handlers ◄──────────────────── JSON / XLSX
//!        │
//!        ▼
//!     notify (new task, task completed)
//! ```
//!
//! ## Modules
//! - `task`: records, wire parsing and deadline classification
//! - `report`: aggregation, time windows and XLSX export
//! - `store`: Supabase PostgREST/GoTrue client and in-memory store
//! - `notify`: email sender implementations and templates
//! - `api`: HTTP routes
//! - `config`: environment configuration

pub mod api;
pub mod config;
pub mod notify;
pub mod report;
pub mod store;
pub mod task;

pub use config::Config;
