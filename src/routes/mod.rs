/// Router Module Index
///
/// Routes are split by who may reach them. The access policy layer in
/// `create_router` sits in front of all four groups.

/// Routes open to anonymous callers.
pub mod public;

/// JSON API routes that need a signed-in caller (401 otherwise).
pub mod authenticated;

/// JSON API routes restricted to the ADMIN role, nested under `/api/admin`.
pub mod admin;

/// Page view models for the guarded page prefixes.
pub mod pages;
