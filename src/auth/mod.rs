//! Identity resolution and role gating.
//!
//! Sign-in itself is delegated to an external [`IdentityProvider`]; this module
//! turns the provider's identity plus the stored profile into a [`UserContext`]
//! that every service call receives explicitly.

mod gate;
mod identity;

pub use gate::{AuthGate, UserContext};
pub use identity::{Identity, IdentityListener, IdentityProvider};
