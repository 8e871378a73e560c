pub mod authorization;
pub mod client_registration;
pub mod discovery;
pub mod errors;
pub mod introspection;
pub mod token;

pub use authorization::{authorization_handler, login_handler};
pub use client_registration::client_registration_handler;
pub use discovery::oauth_authorization_server_handler;
pub use errors::OAuthErrorResponse;
pub use introspection::introspection_handler;
pub use token::token_handler;
