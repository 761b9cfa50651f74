//! Event handlers, one module per emitting contract family
//!
//! Each handler is an `IndexerEngine` method reached from
//! `IndexerEngine::process`.

mod factory;
mod guards;
mod vault;
