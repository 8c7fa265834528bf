//! User management use cases

mod mapper;
mod service;

pub use mapper::{to_user_representation, to_user_response};
pub use service::UserService;
