//! Authentication building blocks: password hashing, signed bearer tokens,
//! and the session key shared with the server's session layer.

mod password;
mod session;
mod token;

pub use password::{hash_password, verify_password};
pub use session::SESSION_USER_ID_KEY;
pub use token::{sign_token, verify_token, Claims};
