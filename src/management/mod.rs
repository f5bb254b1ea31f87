mod token;

pub use token::CREDENTIAL_KEY;
pub use token::TokenStore;
pub use token::TokenStoreError;
