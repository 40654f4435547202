//! Static site builder for folio.
//!
//! Turns a directory of markdown documents into a static site: pages are
//! grouped into collections, composed into layouts and written out in a
//! single all-or-nothing step.

pub mod builder;
pub mod collection;
pub mod config;
pub mod page;
pub mod templates;

pub use builder::{BuildError, BuildFailure, BuildResult, SiteBuilder};
pub use collection::{CollectionIndex, CollectionRules, EntryView};
pub use config::{BuildConfig, CollectionRule, NavLink};
pub use page::Page;
pub use templates::TemplateEngine;
