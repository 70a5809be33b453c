//! Weekly Pomodoros Server - cookie-backed todo store.
//!
//! This crate provides the server component of Weekly Pomodoros, responsible for:
//! - Decoding and encoding the todo collection held in the `todos` cookie
//! - Exposing list/create/update/delete over a small JSON API
//!
//! # Architecture
//!
//! There is no database. Every request carries the full collection in its
//! `todos` cookie; the store reads it, applies one operation and writes the
//! whole collection back with a fresh expiry. The cookie jar is the only
//! shared state, so two concurrent mutations from the same browser race and
//! the later `Set-Cookie` wins.

pub mod config;
pub mod cookie;
pub mod error;
pub mod routes;
pub mod store;
pub mod types;
