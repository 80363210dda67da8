//! Store contracts and their in-process implementations.

pub mod token;

pub use token::{InMemoryTokenStore, TokenStore};
