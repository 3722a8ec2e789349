use attributes::AttributeCatalog;
use lazy_static::lazy_static;

pub mod annotation;
pub mod attributes;
pub mod diff;
pub mod error;
pub mod history;
pub mod navigator;
pub mod session;
pub mod shell;
pub mod store;
pub mod transaction;

lazy_static! {
    // Built-in attribute names: reserved structural keys plus suggestions.
    pub static ref ATTRIBUTE_CATALOG: AttributeCatalog = AttributeCatalog::builtin();
}
