//! # Analyzer Module
//!
//! Policy analysis of Kubernetes manifests. See [`kubepolicy`].

pub mod kubepolicy;
