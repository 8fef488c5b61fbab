//! # frankenlibc-nisplus-harness
//!
//! Command-line driver for the NIS+ services backend. Loads a JSON table dump
//! into a `MemoryTable` and answers `getent services`-style queries through the
//! core lookups and enumeration cursor.

pub mod getent;

pub use getent::{Getent, GetentError, MAX_BUFFER, Query, render_json, render_line};
