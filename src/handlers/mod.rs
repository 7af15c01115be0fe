//! HTTP handlers, grouped by API area. Each handler is a thin adapter: it
//! validates the request, talks to the repository or an external
//! collaborator, and maps failures onto `ApiError`.

pub mod accounts;
pub mod admin;
pub mod cars;
pub mod contact;
pub mod dashboard;
pub mod favorites;
pub mod filters;
pub mod media;
pub mod pages;
