//! Selector resolution.
//!
//! Logical UI targets are described as data ([`SelectorSpec`]) and
//! resolved against a page by a small interpreter ([`Resolver`]) that
//! tries each locator strategy in order.

mod error;
mod resolver;
mod table;

pub use error::{ResolveError, SelectorTableError};
pub use resolver::{Resolved, Resolver, ResolverConfig};
pub use table::{SelectorSpec, SelectorTable, targets};
