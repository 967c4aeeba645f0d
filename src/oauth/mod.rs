//! Usage: OAuth2 authorization-code flow for a single mailbox user: credential
//! persistence, the browser handoff, the redirect callback and token refresh.

pub(crate) mod authorize;
pub(crate) mod callback_server;
pub mod coordinator;
pub mod credential;
pub(crate) mod pkce;
pub mod refresh;
pub mod registration;
pub(crate) mod signal;
pub mod store;
pub mod token_exchange;
pub mod transport;

pub use coordinator::{OAuthCoordinator, DEFAULT_AUTH_TIMEOUT};
pub use credential::Credential;
pub use refresh::{SavingTokenSource, TokenRefresher};
pub use registration::{make_redirect_uri, ClientRegistration, OAuthClientConfig, GMAIL_FULL_SCOPE};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use token_exchange::TokenEndpoint;
pub use transport::AuthenticatedTransport;
