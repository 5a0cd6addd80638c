// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters between the job engine and external tools.

pub mod codec;
pub mod connector;

pub use codec::{OutputLineCodec, MAX_LINE_BYTES};
pub use connector::{
    from_settings, ClaudeConnector, CommandConnector, CommandSpec, Connector, ConnectorError,
    ConnectorKind, ConnectorRegistry, ConnectorSettings, ParseError, ParsedLine,
};

#[cfg(any(test, feature = "test-support"))]
pub use connector::FakeConnector;
