//! RAID-5 striping core
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RAID-5 Core                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │  │  Parity   │   │  Placement   │   │   Stripe Engine     │  │
//! │  │  (XOR)    │   │  (rotation)  │   │   (write/recovery)  │  │
//! │  └───────────┘   └──────────────┘   └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Parity** (`parity.rs`): byte-wise XOR with right-zero-padding.
//! - **Placement** (`placement.rs`): global stripe number → parity/data node
//!   indices, block-id generation.
//! - **Stripe engine** (`engine.rs`, `recovery.rs`): upload fan-out,
//!   metadata commit, parallel reads, single-miss XOR reconstruction.

pub mod engine;
pub mod parity;
pub mod placement;
pub mod recovery;

#[cfg(test)]
mod proptest;

pub use engine::StripeEngine;
