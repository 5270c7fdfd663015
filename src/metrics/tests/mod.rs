//! Tests for the metrics system
