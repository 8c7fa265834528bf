//! User DTOs exchanged across the HTTP boundary.

mod dto_create;
mod dto_get;

pub use dto_create::UserRequest;
pub use dto_get::UserResponse;
