/// Router Module Index
///
/// Organizes the routing logic into security-segregated modules, so that
/// access control is applied explicitly at the module level (via router
/// layers and handler checks) rather than scattered per endpoint.

/// Routes accessible to any client, anonymous included.
pub mod public;

/// Routes protected by the `CallerContext` extractor middleware.
/// Require a validated caller identity.
pub mod authenticated;

/// Routes restricted to callers holding the administrative authority.
pub mod admin;
