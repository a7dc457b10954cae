//! Typed client and cache-synchronization core for the backoffice admin API.
//!
//! # Overview
//! Requests are built as plain `HttpRequest` values and responses parsed
//! from plain `HttpResponse` values (host-does-IO pattern); a [`Transport`]
//! performs the round-trip. On top of that sits a small query cache:
//! keyed reads with request coalescing, write hooks that reconcile the
//! cache by invalidation or direct write, and optimistic updates with
//! rollback.
//!
//! # Design
//! - [`QueryKey`]s are deterministic: equal resource + filters give equal
//!   keys, and `[resource]` is the ancestor of every key of that resource.
//! - The cache ([`QueryClient`]) and session ([`SessionStore`]) are injected
//!   objects created by [`Backoffice::new`], never globals.
//! - Every area (users, settings, content, referral, payments, games) is a
//!   thin layer over the generic [`Collection`] and [`Singleton`] hooks.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod backoffice;
pub mod cache;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod form;
pub mod gateway;
pub mod http;
pub mod infinite;
pub mod keys;
pub mod mutation;
pub mod optimistic;
pub mod query;
pub mod resource;
pub mod session;
pub mod transport;
pub mod types;

pub use backoffice::Backoffice;
pub use client::ApiClient;
pub use config::{ClientConfig, QueryConfig};
pub use envelope::{Envelope, Page, Unwrap};
pub use error::ApiError;
pub use filter::{ClientPager, Searchable};
pub use form::{FilePart, FormPayload, MultipartForm};
pub use gateway::Gateway;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use infinite::{InfiniteQuery, Pages};
pub use keys::{QueryKey, Resource};
pub use mutation::{Mutation, MutationState};
pub use optimistic::Optimistic;
pub use query::{CacheEvent, Query, QueryClient, QueryState};
pub use resource::{Collection, ItemUpdate, Singleton};
pub use session::{Session, SessionStore};
pub use transport::{ReqwestTransport, Transport};
