//! Application layer
//!
//! Use cases orchestrating the identity-provider port.

pub mod users;

pub use users::UserService;
