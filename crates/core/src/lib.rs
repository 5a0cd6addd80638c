// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! clr-core: data model for the cli-runner job service

pub mod macros;

pub mod clock;
pub mod event;
pub mod id;
pub mod job;
pub mod ring;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, Stamp, SystemClock};
pub use event::{Event, EventKind, Payload};
pub use id::SubscriberId;
pub use job::{JobId, JobResult, JobStatus, EXIT_CODE_STOPPED};
pub use ring::RingBuffer;
