//! # spconnect
//!
//! Connection and authentication negotiation core for SharePoint Online
//! style services. A single logical connect request selects one of seven
//! mutually-exclusive authentication strategies, establishes an
//! authenticated session, and installs it as the current process-wide
//! context — reusing the expensive token-acquisition engine when the new
//! request is provably identity-equivalent to the current session.
//!
//! ## Modules
//!
//! - [`auth`] - Credential/certificate resolution, token flows and the
//!   authentication manager
//! - [`connect`] - The connect request, coordinator and host collaborator
//!   seams
//! - [`session`] - The authenticated session and the current-session store

pub mod auth;
pub mod connect;
pub mod session;

pub use auth::{ConnectError, ConnectFailure, Credential};
pub use connect::{Collaborators, ConnectCoordinator, ConnectOptions, ConnectRequest};
pub use session::{ConnectionMethod, Session, SessionIdentity, SessionStore};
