use axum::Router;

/// A storefront module that contributes HTTP routes.
///
/// Each business module (catalog, orders, payments, ...) implements this
/// trait. The server binary collects all modules and merges their routes
/// into a single Router.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes. Paths are absolute (`/api/...`, `/admin/...`).
    fn routes(&self) -> Router;
}
