pub mod collaborators;
pub mod coordinator;
pub mod request;
mod strategies;

pub use collaborators::{
    Collaborators, CredentialPrompter, DriveRegistry, EnvironmentSink, MemoryCertificateStore,
    MemoryCredentialStore, MemoryDriveRegistry, MemoryEnvironment, MemoryMessageSink, MessageSink,
    NoPrompter, NoWebLoginBroker, WebLoginBroker,
};
pub use coordinator::{ConnectCoordinator, ConnectOptions, HOST_ENV_KEY, SITE_ENV_KEY};
pub use request::{
    AcsAppOnlyRequest, AdminShellRequest, CertificateRequest, ConnectRequest, CredentialsRequest,
    DeviceLoginRequest, WebLoginRequest,
};
