//! Core type definitions.
//!
//! - [`id`] - Type-safe ID newtypes (`ProductId`, `UserId`)
//! - [`line`] - One product's presence in a cart ([`CartLine`], [`Product`])
//! - [`cart`] - The cart snapshot ([`Cart`]) and its total/count arithmetic

pub mod cart;
pub mod id;
pub mod line;

pub use cart::Cart;
pub use id::{ProductId, UserId};
pub use line::{CartLine, Product};
