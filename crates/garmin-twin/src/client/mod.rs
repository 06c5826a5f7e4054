pub mod api;
pub mod oauth1;
pub mod session;
pub mod tokens;

pub use api::GarminClient;
pub use oauth1::{OAuth1Signer, OAuthConsumer};
pub use session::Session;
pub use tokens::{OAuth1Token, OAuth2Token};
