//! Core types for AIStyleHub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod garment;
pub mod id;
pub mod price;
pub mod style;

pub use garment::{ProductType, ProductTypeError};
pub use id::*;
pub use price::{Price, PriceError};
pub use style::{StylePrompt, StylePromptError};
