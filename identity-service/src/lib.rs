//! Identity Service
//!
//! Registers accounts, verifies credentials, manages role assignments and
//! issues bearer tokens through the `auth` core. Persistence and password
//! hashing sit behind the [`CredentialStore`] and [`RoleStore`] traits.

pub mod config;
pub mod models;
pub mod repository;
pub mod service;

pub use config::ServiceConfig;
pub use models::{Identity, Registration, Role};
pub use repository::{
    CredentialStore, InMemoryCredentialStore, InMemoryRoleStore, PasswordPolicy, RoleStore,
};
pub use service::{CredentialAuthenticator, IdentityService, RoleAssignmentService};
