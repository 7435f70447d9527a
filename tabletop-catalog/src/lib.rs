//! Tabletop game catalog data model and persistence contracts.
//!
//! This crate defines the entities mirrored from the upstream catalog service
//! without any database or network dependencies. The crawler writes these
//! types through [`GameStore`] / [`FamilyStore`]; the resolution cache reads
//! them back out.

pub mod clock;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{FamilyStore, GameStore, StoreError};
pub use types::*;
