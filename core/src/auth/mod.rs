pub mod certificate;
pub mod credentials;
pub mod device_code;
pub mod errors;
pub mod manager;
pub mod token_cache;
pub mod types;

pub use certificate::{Certificate, CertificateResolver, CertificateStore};
pub use credentials::{Credential, CredentialResolver, CredentialStore};
pub use device_code::DeviceCodeClient;
pub use errors::{ConnectError, ConnectFailure};
pub use manager::{AuthenticationManager, TokenIdentity};
pub use token_cache::TokenCache;
pub use types::{AuthToken, AzureEnvironment, CachedToken, DeviceCodeInfo};
