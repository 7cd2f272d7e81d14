//! End-to-end scenario suites over the public API.

mod find_all;
mod indentation;
mod lists;
mod recovery;
