//! Authentication: password hashing, session tokens, bearer middleware.

pub mod middleware;
pub mod password;
pub mod token;
