//! Perch Hardware Abstraction Layer
//!
//! Board-agnostic storage traits implemented by chip-specific HALs.
//! Pin-level I/O (step/dir/enable outputs, limit switch inputs) goes
//! through `embedded-hal` directly; only persistent storage needs a
//! project-specific abstraction.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  perch-drivers (calibration store)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  perch-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  perch-hal-   │
//!             │    rp2040     │
//!             └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{FlashError, FlashStorage, StorageKey};
