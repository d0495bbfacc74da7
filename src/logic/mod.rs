//! Logic modules: pure computations behind the node facades.
//!
//! # Modules
//!
//! - `radial`: Radial-attention compatible resolution search and batch table update

pub mod radial;
