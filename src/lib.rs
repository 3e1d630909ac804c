//! Workspace root package.
//!
//! Exists so repo-wide dev tooling (git hooks via `cargo-husky`) installs on
//! `cargo test`. All functionality lives in the member crates under
//! `crates/`.
