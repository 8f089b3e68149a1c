//! Binaries built on feedwatch-core

pub mod common;
