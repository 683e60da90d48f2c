//! Core functionality for bastion
//!
//! This crate contains the credential-verification pipeline that decides whether a login
//! attempt succeeds, tracks consecutive failures per username, blocks further attempts once
//! a threshold is reached, and hands a [`BreachEvent`] to the [`AlertPublisher`] exactly once
//! per threshold crossing.
//!
//! The pieces, leaves first:
//!
//! - [`AttemptStore`]: username → consecutive failure count, atomic per key
//! - [`CredentialVerifier`]: checks a [`Credential`] against a [`UserDirectory`] and a [`SecretMatcher`]
//! - [`ThrottleGuard`]: wraps the verifier with the store and raises the breach alert
//! - [`AlertPublisher`]: re-exported from `bastion-alert`, delivers alerts off the request path
//!
//! Storage backends implement [`AttemptStore`] and [`UserDirectory`]; see
//! [`storage::InMemoryAttemptStore`] and the `bastion-storage-sqlite` crate.
pub mod attempt;
pub mod config;
pub mod crypto;
pub mod error;
pub mod outcome;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod token;
pub mod user;
pub mod validation;

pub use attempt::AttemptRecord;
pub use config::ThrottleConfig;
pub use crypto::{PasswordHashMatcher, SecretMatcher};
pub use error::Error;
pub use outcome::{AuthOutcome, Credential, RejectReason};
pub use repositories::{AttemptStore, UserDirectory};
pub use services::{CredentialVerifier, ThrottleGuard, ThrottleState};
pub use token::{IssuedToken, JwtAlgorithm, JwtClaims, JwtConfig, JwtTokenIssuer, TokenIssuer};
pub use user::{Principal, StoredUser};

pub use bastion_alert::{AlertConfig, AlertPublisher, AlertTransport, BreachEvent};
