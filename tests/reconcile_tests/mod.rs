//! Integration tests for Dataset reconciliation
//!
//! # Test Organization
//!
//! - `cluster`: an in-memory stand-in for the API server that records every
//!   call, plus fixtures for Datasets, DataPlugins and template trees
//!
//! - `dataset_lifecycle`: stories about how a Dataset moves through the
//!   controller (unready, plugin applied, plugin changed, plugin missing)

mod dataset_lifecycle;
