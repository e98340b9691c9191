pub mod base;
pub mod factory;
pub mod parsers;

pub use base::{BaseAdapter, ListingParser, SiteAdapter};
