//! # Accounts (User Registration)
//!
//! `accounts` serves a server-rendered registration page. A `GET /register`
//! renders an empty form; a `POST /register` binds the submitted fields,
//! validates them and either stores a new user and redirects to `/login`, or
//! re-renders the page with the errors shown inline next to each field.
//!
//! ## Layers
//!
//! - **Forms:** [`accounts::forms`] binds and validates the submission. Only a
//!   validated [`accounts::forms::CleanRegistration`] can be saved.
//! - **Store:** [`accounts::store::UserStore`] persists users, backed by
//!   PostgreSQL in production and by memory in tests.
//! - **Templates:** [`accounts::templates::Templates`] renders pages with tera.
//!
//! Passwords are hashed with argon2id before they reach the store and are never
//! echoed back into a rendered page.

pub mod accounts;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
