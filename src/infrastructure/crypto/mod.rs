//! Token cryptography

pub mod jwt;
