mod collection;
mod cookie;
mod environment;
mod factory;
mod form;
mod http_basic;
mod http_digest;
mod jwt;
mod session;
mod token;
mod traits;
mod types;
mod url_checker;

pub use collection::AuthenticatorCollection;
pub use cookie::CookieAuthenticator;
pub use environment::EnvironmentAuthenticator;
pub use factory::{
    create_authenticator, create_authenticators, create_hasher, create_identifier,
    create_resolver,
};
pub use form::FormAuthenticator;
pub use http_basic::HttpBasicAuthenticator;
pub use http_digest::{digest_ha1, DigestOptions, HttpDigestAuthenticator};
pub use jwt::{parse_algorithms, JwtAuthenticator, JwtOptions};
pub use session::SessionAuthenticator;
pub use token::{TokenAuthenticator, TokenSource};
pub use traits::*;
pub use types::*;
pub use url_checker::{DefaultUrlChecker, UrlChecker};

pub(crate) use url_checker::login_url_mismatch;
