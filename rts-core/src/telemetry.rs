/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Running-state mirrors, one slot per registry entry.
//!
//! A slot reads `1` exactly while its job's execution unit is between START
//! and COMPLETE.  External samplers (plot stream, indicator outputs) read the
//! slots at their own cadence; the engine only guarantees that the slots are
//! always current.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug)]
pub struct Telemetry {
    slots: Vec<AtomicU8>,
}

impl Telemetry {
    /// `n` slots, all idle.
    pub fn new(n: usize) -> Self {
        Self {
            slots: (0..n).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drive a slot high or low.  Out-of-range slots are ignored.
    pub fn set_running(&self, slot: usize, running: bool) {
        if let Some(s) = self.slots.get(slot) {
            s.store(u8::from(running), Ordering::Release);
        }
    }

    pub fn is_running(&self, slot: usize) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|s| s.load(Ordering::Acquire) == 1)
    }

    /// Current value of every slot.
    pub fn snapshot(&self) -> Vec<u8> {
        self.slots.iter().map(|s| s.load(Ordering::Acquire)).collect()
    }

    /// Plotter-friendly sample: slot values separated by single spaces.
    pub fn plot_line(&self) -> String {
        self.snapshot()
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_idle_and_follow_set_running() {
        let t = Telemetry::new(3);
        assert_eq!(t.snapshot(), vec![0, 0, 0]);

        t.set_running(1, true);
        assert!(t.is_running(1));
        assert!(!t.is_running(0));
        assert_eq!(t.plot_line(), "0 1 0");

        t.set_running(1, false);
        assert_eq!(t.plot_line(), "0 0 0");
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let t = Telemetry::new(1);
        t.set_running(7, true);
        assert!(!t.is_running(7));
        assert_eq!(t.snapshot(), vec![0]);
    }
}
