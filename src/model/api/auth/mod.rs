mod audience;
mod credentials;
mod session;
mod token;

pub use audience::{Audience, Committee, Household, Member};
pub use credentials::{check_password, LoginRequest, PasswordChange, ProfileSpec};
pub use session::SessionUser;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
