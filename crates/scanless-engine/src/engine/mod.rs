//! Parse-time machinery.
//!
//! Matching runs over one [`context::ParserContext`] per parse: the token
//! matcher and rule parser thread position, barrier, and error state through
//! it; the node arena inside it becomes the returned [`ast::Ast`].

pub(crate) mod ast;
pub(crate) mod cache;
pub(crate) mod context;
pub(crate) mod matcher;
pub(crate) mod recovery;
pub(crate) mod report;
pub(crate) mod rules;
pub(crate) mod run;
pub(crate) mod skip;
pub(crate) mod trace;

#[cfg(test)]
mod support;

#[cfg(test)]
mod matcher_tests;
#[cfg(test)]
mod rules_tests;
