//! Integration tests for the REST remote store

mod common;
mod test_errors;
mod test_probe;
mod test_store;
