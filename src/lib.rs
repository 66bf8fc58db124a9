//! Client-side session, conversation and draft orchestration for real-time chat.
//!
//! [`usecases::context::ChatApp`] is the surface a presentation layer talks to;
//! [`usecases::contracts::ChatBackend`] is the seam to the remote service.

pub mod app;
pub mod backend;
pub mod cli;
pub mod domain;
pub mod infra;
#[cfg(test)]
mod test_support;
pub mod usecases;
