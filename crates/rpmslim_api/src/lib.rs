//! # rpmslim API
//!
//! Resource vocabulary and transport for the Pulp 3 RPM plugin.
//!
//! This crate provides:
//! - Resource types (repositories, remotes, versions, publications,
//!   distributions, packages, tasks)
//! - Request bodies for the mutating endpoints
//! - The `PulpApi` collaborator trait consumed by the engine
//! - An HTTP transport over a pluggable `HttpClient`
//!
//! No orchestration happens here: every call is one request/response.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod http;
mod resources;
mod transport;

pub use error::{ApiError, ApiResult};
pub use http::{HttpClient, HttpResponse, HttpTransport, Method, ReqwestClient, API_ROOT};
pub use resources::{
    CopyConfig, CopyRequest, Distribution, Href, Labels, NewDistribution, NewPublication,
    NewRemote, NewRepository, Package, PackageQuery, Page, Publication, Remote, Repository,
    RepositoryVersion, SyncRequest, Task, TaskRef, TaskState,
};
pub use transport::PulpApi;
