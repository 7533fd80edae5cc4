pub mod password;
pub mod token;

pub use password::{HashingFailure, PasswordVault};
pub use token::{AuthError, Claims, IssueError, TokenService, TOKEN_TTL_SECONDS};
