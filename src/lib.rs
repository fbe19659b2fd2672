//! Bookshelf application library
//!
//! Project modules served by the bookshelf HTTP facade. The only module is
//! `books`, an in-memory shelf with create, list, fetch, update and delete.

pub mod modules;

pub use modules::*;
