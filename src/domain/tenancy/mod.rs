//! Multi-tenant data isolation.
//!
//! Three pieces: the acting [`Principal`], the [`TenantScope`] every
//! repository read must honor, and [`resolve_owner_tenant`] for one-time
//! ownership inheritance at creation.

mod ownership;
mod principal;
mod scope;

pub use ownership::resolve_owner_tenant;
pub use principal::{Principal, Role};
pub use scope::TenantScope;
