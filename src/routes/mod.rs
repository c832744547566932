/// Router Module Index
///
/// Splits the catalog routes by the access they require. `create_router`
/// wraps each tier in its guard with `route_layer` before merging, so a
/// route cannot be mounted without its role check.
///
/// Routes for USER or ADMIN (catalog reads).
pub mod viewer;

/// Routes for any authenticated identity (API docs).
pub mod authenticated;

/// Routes restricted to ADMIN (every catalog write).
pub mod admin;
