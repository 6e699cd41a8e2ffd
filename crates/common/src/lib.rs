//! Shared building blocks for the user service crates.
//!
//! - `types`: small wire types reused by several HTTP surfaces.
//! - `utils::logging`: tracing subscriber initialisation.

pub mod types;

pub mod utils {
    pub mod logging;
}
