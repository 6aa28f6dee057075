// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

use time::OffsetDateTime;

/// Supplies the current time. Substitutable for deterministic testing of
/// expiry and rotation decisions.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
