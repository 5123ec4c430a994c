//! Integration tests for partitioning, routing, and the interception
//! decorators, driven by a scripted stub host compiler.

pub mod harness;
