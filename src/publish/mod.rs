//! Publishing installer artifacts to GitHub releases.
//!
//! Everything here talks to the GitHub REST API through [`ReleaseClient`];
//! the API itself is the source of truth for release state, and nothing is
//! rolled back on failure; a re-run overwrites colliding assets instead.

pub mod assets;
pub mod client;
pub mod release;
pub mod updater;

pub use client::{ApiError, NewRelease, Release, ReleaseAsset, ReleaseClient};
pub use release::create_or_find_release;
