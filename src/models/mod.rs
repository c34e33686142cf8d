//! Data models for the Reading Circle backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod book;
mod meet;
mod member;
mod meta;

pub use book::*;
pub use meet::*;
pub use member::*;
pub use meta::*;
