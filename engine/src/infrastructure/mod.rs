// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Adapters
//!
//! Concrete implementations of the domain's ports: an HTTP-backed
//! `ApiClient`, file-system and in-memory `ByteSource`s, and a
//! Prometheus metrics endpoint.

pub mod api_client;
pub mod byte_source;
pub mod metrics;

pub use api_client::HttpApiClient;
pub use byte_source::{FileByteSource, InMemoryByteSource};
pub use metrics::{EngineMetrics, MetricsEndpoint};
