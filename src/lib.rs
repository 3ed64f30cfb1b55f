//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema-aware YANG data trees in pure Rust.
//!
//! A [`Context`](context::Context) loads YANG (or YIN) modules from a set of
//! search directories and compiles them into schema trees. Instance documents
//! encoded in XML or JSON (RFC 7951) are parsed into
//! [`DataTree`](data::DataTree)s validated against the loaded schema.
//!
//! ## Design Goals
//! * Schema and data nodes are lightweight handles into arenas owned by the
//!   context and by each data tree, so the borrow checker rules out dangling
//!   references at compile time
//! * Schema and data trees share the same navigation API (siblings,
//!   ancestors, depth-first traversal)
//! * Navigation through absent nodes can be chained with `?`-friendly
//!   [`NodeNavigation`] methods
//! * Path queries on both data and schema trees
//!
//! ## Examples
//!
//! See the `demos` directory.

mod compile;
mod error;
mod json;
mod printer;
mod validate;
mod value;
mod xml;
mod xpath;
mod yang;
mod yin;

pub mod context;
pub mod data;
pub mod iter;
pub mod logging;
pub mod schema;
pub mod utils;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::iter::NodeNavigation;
