// Dapper - dapper
// Module: Power Control
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! System and debug power-up through the DP `CTRL/STAT` register.
//!
//! A request writes the power-up request bit together with the lane mask,
//! then polls `CTRL/STAT` until the matching acknowledge bit shows up. Both
//! acknowledge bits are compared, so a request only succeeds when its own
//! domain is the one acknowledged.

use std::{thread, time::Duration};

use dapper_error::{helpers, Result};
use log::{debug, trace};

/// Address of the DP `CTRL/STAT` register
pub const DP_CTRL_STAT: u32 = 0x04;

const LANE_MASK: u32 = 0x0F << 8;
const CSYSPWRUPREQ: u32 = 0x40 << 24;
const CDBGPWRUPREQ: u32 = 0x10 << 24;
const CSYSPWRUPACK: u32 = 0x80 << 24;
const CDBGPWRUPACK: u32 = 0x20 << 24;

/// Register access through the debug port.
pub trait CoreSightAccess {
    /// Read a DP (`access_port == false`) or AP register.
    fn core_sight_read(&mut self, access_port: bool, address: u32) -> Result<u32>;

    /// Write a DP (`access_port == false`) or AP register.
    fn core_sight_write(&mut self, access_port: bool, address: u32, data: u32) -> Result<()>;
}

/// How long to wait for a power acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerControlPolicy {
    /// Number of status reads
    pub attempts: u32,
    /// Pause between reads
    pub interval: Duration,
}

impl Default for PowerControlPolicy {
    fn default() -> Self {
        Self {
            attempts: 11,
            interval: Duration::from_millis(100),
        }
    }
}

impl PowerControlPolicy {
    /// Policy polling `attempts` times without pausing.
    #[must_use]
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            interval: Duration::ZERO,
        }
    }
}

/// Request system (`sys_power`) or debug power and wait for the acknowledge.
///
/// # Errors
///
/// Returns `POWER_CONTROL_FAILED` when no read within the policy shows the
/// expected acknowledge; register access errors are passed through.
pub fn power_control<A>(access: &mut A, sys_power: bool, policy: &PowerControlPolicy) -> Result<()>
where
    A: CoreSightAccess + ?Sized,
{
    let (request, expected) = if sys_power {
        (LANE_MASK | CSYSPWRUPREQ, CSYSPWRUPACK)
    } else {
        (LANE_MASK | CDBGPWRUPREQ, CDBGPWRUPACK)
    };
    access.core_sight_write(false, DP_CTRL_STAT, request)?;

    for attempt in 0..policy.attempts {
        let status = access.core_sight_read(false, DP_CTRL_STAT)?;
        if status & (CSYSPWRUPACK | CDBGPWRUPACK) == expected {
            debug!("power request sys={sys_power} acknowledged after {} reads", attempt + 1);
            return Ok(());
        }
        trace!("CTRL/STAT {status:#010x}, waiting for {expected:#010x}");
        if attempt + 1 < policy.attempts {
            thread::sleep(policy.interval);
        }
    }
    Err(helpers::power_control_failed(sys_power))
}

#[cfg(test)]
mod tests {
    use dapper_error::codes;

    use super::*;

    /// Acknowledges a request after a fixed number of reads.
    struct SlowPort {
        ctrl_stat: u32,
        reads:     u32,
        ack_after: Option<u32>,
        writes:    Vec<(bool, u32, u32)>,
    }

    impl SlowPort {
        fn new(ack_after: Option<u32>) -> Self {
            Self {
                ctrl_stat: 0,
                reads: 0,
                ack_after,
                writes: Vec::new(),
            }
        }
    }

    impl CoreSightAccess for SlowPort {
        fn core_sight_read(&mut self, _access_port: bool, _address: u32) -> Result<u32> {
            self.reads += 1;
            if self.ack_after.is_some_and(|after| self.reads >= after) {
                Ok(self.ctrl_stat | ((self.ctrl_stat & (CSYSPWRUPREQ | CDBGPWRUPREQ)) << 1))
            } else {
                Ok(self.ctrl_stat)
            }
        }

        fn core_sight_write(&mut self, access_port: bool, address: u32, data: u32) -> Result<()> {
            self.writes.push((access_port, address, data));
            self.ctrl_stat = data;
            Ok(())
        }
    }

    #[test]
    fn test_system_power_request_word() {
        let mut port = SlowPort::new(Some(1));
        power_control(&mut port, true, &PowerControlPolicy::immediate(3)).unwrap();
        assert_eq!(port.writes, vec![(false, DP_CTRL_STAT, 0x4000_0F00)]);
        assert_eq!(port.reads, 1);
    }

    #[test]
    fn test_debug_power_waits_for_ack() {
        let mut port = SlowPort::new(Some(4));
        power_control(&mut port, false, &PowerControlPolicy::immediate(11)).unwrap();
        assert_eq!(port.writes, vec![(false, DP_CTRL_STAT, 0x1000_0F00)]);
        assert_eq!(port.reads, 4);
    }

    #[test]
    fn test_gives_up_after_attempts() {
        let mut port = SlowPort::new(None);
        let err = power_control(&mut port, true, &PowerControlPolicy::immediate(5)).unwrap_err();
        assert_eq!(err.code, codes::POWER_CONTROL_FAILED);
        assert_eq!(port.reads, 5);
    }

    /// Reports both acknowledge bits on every read.
    struct BothAcks;

    impl CoreSightAccess for BothAcks {
        fn core_sight_read(&mut self, _access_port: bool, _address: u32) -> Result<u32> {
            Ok(CSYSPWRUPACK | CDBGPWRUPACK)
        }

        fn core_sight_write(&mut self, _access_port: bool, _address: u32, _data: u32) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_other_domain_ack_does_not_count() {
        let err = power_control(&mut BothAcks, false, &PowerControlPolicy::immediate(2)).unwrap_err();
        assert_eq!(err.code, codes::POWER_CONTROL_FAILED);
        assert!(err.message.starts_with("Debug power"));
    }

    #[test]
    fn test_default_policy() {
        let policy = PowerControlPolicy::default();
        assert_eq!(policy.attempts, 11);
        assert_eq!(policy.interval, Duration::from_millis(100));
    }
}
