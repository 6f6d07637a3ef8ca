//! 1kHz tick handler (spec §4.9). Pure state machine: each [`Scheduler::tick`]
//! call advances one logical millisecond and returns the
//! [`SchedulerAction`]s the caller (the `tokio::time::interval` task in
//! `bins/`) should perform. Kept free of `protocol`/`control` so the cadence
//! logic can be unit-tested without a live network stack, matching the
//! effects-returned shape of [`control::Control::sync`]/`protocol::dispatch`.

use std::net::SocketAddr;

/// Ticks between "no data received yet" color-refresh checks.
pub const COLOR_REFRESH_PERIOD: u64 = 256;
/// Ticks between sACN universe-discovery emissions.
pub const DISCOVERY_PERIOD: u64 = 16_384;
/// Maximum concurrently pending `ArtPollReply` sends.
pub const POLL_REPLY_SLOTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerAction {
    /// No universe data has arrived since boot/last refresh point; re-render
    /// the strip startup pattern so a freshly-plugged controller still shows
    /// something.
    RefreshStartupColor,
    /// Build and multicast a paged sACN universe-discovery datagram.
    EmitSacnDiscovery,
    /// A pending `ArtPoll` reply's delay has elapsed; send the reply for
    /// `universe` to `sender`.
    SendPollReply(SocketAddr, u16),
    /// The scheduled-reset countdown reached zero: drop sACN multicast
    /// memberships and perform a hard reset.
    HardReset,
}

#[derive(Debug, Clone, Copy)]
struct PollReplySlot {
    sender: SocketAddr,
    universe: u16,
    delay_ticks: u32,
}

/// Computes how many hardware-counter ticks elapsed between two 32-bit
/// counter reads, correctly handling one counter wraparound. Extracted as a
/// pure function so the overflow path is testable without driving four
/// billion real ticks.
fn wrapping_delta(prev: u32, now: u32) -> u64 {
    now.wrapping_sub(prev) as u64
}

pub struct Scheduler {
    hw_counter: u32,
    cycles: u64,
    data_received: bool,
    slots: [Option<PollReplySlot>; POLL_REPLY_SLOTS],
    reset_countdown: Option<u32>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            hw_counter: 0,
            cycles: 0,
            data_received: false,
            slots: [None; POLL_REPLY_SLOTS],
            reset_countdown: None,
        }
    }

    /// 64-bit monotonic tick count since boot.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Mark that at least one universe has been latched; suppresses further
    /// [`SchedulerAction::RefreshStartupColor`] events.
    pub fn note_data_received(&mut self) {
        self.data_received = true;
    }

    /// Queue a delayed `ArtPollReply` for `universe`. Returns `false` if all
    /// [`POLL_REPLY_SLOTS`] are already occupied (spec §5: "serialized by
    /// the Systick slot list, max 8 pending").
    pub fn schedule_poll_reply(&mut self, sender: SocketAddr, universe: u16, delay_ticks: u32) -> bool {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(PollReplySlot {
                    sender,
                    universe,
                    delay_ticks: delay_ticks.max(1),
                });
                true
            }
            None => {
                tracing::warn!("poll-reply queue full, dropping reply to {sender}");
                false
            }
        }
    }

    /// Arm the scheduled-reset countdown.
    pub fn schedule_reset(&mut self, delay_ticks: u32) {
        self.reset_countdown = Some(delay_ticks);
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_countdown.is_some()
    }

    /// Advance one logical millisecond, reading `raw_hw_counter` as the
    /// current 32-bit hardware tick count (wraps at `u32::MAX`).
    pub fn tick_with_hw_counter(&mut self, raw_hw_counter: u32) -> Vec<SchedulerAction> {
        let delta = wrapping_delta(self.hw_counter, raw_hw_counter);
        self.hw_counter = raw_hw_counter;
        self.cycles = self.cycles.wrapping_add(delta.max(1));

        let mut actions = Vec::new();

        if self.cycles % COLOR_REFRESH_PERIOD == 0 && !self.data_received {
            actions.push(SchedulerAction::RefreshStartupColor);
        }
        if self.cycles % DISCOVERY_PERIOD == 0 {
            actions.push(SchedulerAction::EmitSacnDiscovery);
        }

        for slot in self.slots.iter_mut() {
            if let Some(pending) = slot {
                pending.delay_ticks -= 1;
                if pending.delay_ticks == 0 {
                    actions.push(SchedulerAction::SendPollReply(pending.sender, pending.universe));
                    *slot = None;
                }
            }
        }

        if let Some(count) = self.reset_countdown {
            if count == 0 {
                actions.push(SchedulerAction::HardReset);
                self.reset_countdown = None;
            } else {
                self.reset_countdown = Some(count - 1);
            }
        }

        actions
    }

    /// Convenience for callers without a real hardware counter to read
    /// (this workspace's `tokio::time::interval`-driven port): advances the
    /// internal counter by exactly one tick.
    pub fn tick(&mut self) -> Vec<SchedulerAction> {
        let next = self.hw_counter.wrapping_add(1);
        self.tick_with_hw_counter(next)
    }
}
