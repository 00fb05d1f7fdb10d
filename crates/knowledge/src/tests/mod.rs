//! Shared test support and cross-module tests.
