//! Blocking schemes and forward-index construction.

pub mod scheme;
pub mod forward;

pub use scheme::{Scheme, SchemeId, SchemeKind};
pub use forward::ForwardIndex;
