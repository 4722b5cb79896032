//! Data models for the Biblioperson library.
//!
//! Field names serialize in camelCase to match the web client.

mod annotation;
mod author;
mod document;
mod persona;
mod reading;
mod user;

pub use annotation::*;
pub use author::*;
pub use document::*;
pub use persona::*;
pub use reading::*;
pub use user::*;
