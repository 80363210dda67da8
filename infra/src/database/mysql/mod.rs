//! MySQL repository implementations

pub mod token_store_impl;

pub use token_store_impl::MySqlTokenStore;
