use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::Serialize;

use crate::address::ChannelId;

/// Bit pattern stored for an unknown level.
const UNKNOWN_LEVEL: f32 = -1.0;

/// Token value meaning no fade owns the fader.
const IDLE: u64 = 0;

/// Last known state of one fader.
///
/// Both fields are single atomics, so the monitor thread and any number of
/// fade threads can read and write without tearing. `active` holds the token
/// of the fade that currently owns the fader, or zero when idle; a fade only
/// ever clears its own token.
#[derive(Debug)]
pub struct Fader {
    channel: ChannelId,
    level_bits: AtomicU32,
    active: AtomicU64,
    next_token: AtomicU64,
}

impl Fader {
    pub fn new(channel: ChannelId) -> Self {
        Self {
            channel,
            level_bits: AtomicU32::new(UNKNOWN_LEVEL.to_bits()),
            active: AtomicU64::new(IDLE),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Last known level in `[0, 1]`, or `None` if unknown.
    pub fn level(&self) -> Option<f32> {
        let level = f32::from_bits(self.level_bits.load(Ordering::Acquire));
        (level >= 0.0).then_some(level)
    }

    pub fn set_level(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Release);
    }

    pub fn clear_level(&self) {
        self.set_level(UNKNOWN_LEVEL);
    }

    /// True while a fade owns the fader.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) != IDLE
    }

    /// Claim the fader for a new fade. Returns the ownership token, or `None`
    /// if another fade already holds it.
    pub fn try_activate(&self) -> Option<u64> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.active
            .compare_exchange(IDLE, token, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| token)
    }

    pub fn is_owned_by(&self, token: u64) -> bool {
        self.active.load(Ordering::Acquire) == token
    }

    /// Release ownership if `token` still holds it.
    pub fn release(&self, token: u64) {
        let _ = self
            .active
            .compare_exchange(token, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Clear ownership unconditionally. Returns whether a fade was active.
    pub fn deactivate(&self) -> bool {
        self.active.swap(IDLE, Ordering::AcqRel) != IDLE
    }

    /// Human-readable level line, e.g. `channel 3 : 0.75` or `dca 1 : ??`.
    pub fn level_message(&self) -> String {
        format_level(self.channel, self.level())
    }

    pub fn snapshot(&self) -> FaderSnapshot {
        FaderSnapshot {
            channel: self.channel.index(),
            group: self.channel.group().name(),
            index: self.channel.index_in_group(),
            level: self.level(),
            active: self.is_active(),
        }
    }
}

/// Point-in-time copy of a [`Fader`], for display and serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaderSnapshot {
    pub channel: usize,
    pub group: &'static str,
    pub index: usize,
    pub level: Option<f32>,
    pub active: bool,
}

pub(crate) fn format_level(channel: ChannelId, level: Option<f32>) -> String {
    match level {
        Some(level) => format!("{channel} : {level:.2}"),
        None => format!("{channel} : ??"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;

    fn fader(id: usize) -> Fader {
        Fader::new(ChannelId::new(id).unwrap())
    }

    #[test]
    fn starts_unknown_and_idle() {
        let f = fader(0);
        assert_eq!(f.level(), None);
        assert!(!f.is_active());
        assert_eq!(f.level_message(), "channel 1 : ??");
    }

    #[test]
    fn level_message_uses_two_decimals() {
        let f = fader(72);
        f.set_level(0.756);
        assert_eq!(f.level_message(), "dca 1 : 0.76");
        f.clear_level();
        assert_eq!(f.level_message(), "dca 1 : ??");
    }

    #[test]
    fn second_activation_is_refused() {
        let f = fader(5);
        let token = f.try_activate().unwrap();
        assert!(f.try_activate().is_none());
        assert!(f.is_owned_by(token));
        f.release(token);
        assert!(!f.is_active());
        assert!(f.try_activate().is_some());
    }

    #[test]
    fn stale_release_keeps_new_owner() {
        let f = fader(5);
        let first = f.try_activate().unwrap();
        assert!(f.deactivate());
        let second = f.try_activate().unwrap();

        f.release(first);
        assert!(f.is_owned_by(second));
        assert!(f.is_active());
    }

    #[test]
    fn snapshot_serializes() {
        let f = fader(33);
        f.set_level(0.5);
        let json = serde_json::to_value(f.snapshot()).unwrap();
        assert_eq!(json["group"], "aux");
        assert_eq!(json["index"], 2);
        assert_eq!(json["level"], 0.5);
        assert_eq!(json["active"], false);
    }

    proptest! {
        #[test]
        fn concurrent_writers_never_tear(levels in proptest::collection::vec(0u32..=1024, 1..16)) {
            let f = Arc::new(fader(0));
            let written: Vec<f32> = levels.iter().map(|&u| u as f32 / 1024.0).collect();

            let writers: Vec<_> = written
                .iter()
                .map(|&level| {
                    let f = Arc::clone(&f);
                    thread::spawn(move || {
                        for _ in 0..100 {
                            f.set_level(level);
                        }
                    })
                })
                .collect();

            let reader = {
                let f = Arc::clone(&f);
                let written = written.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if let Some(level) = f.level() {
                            assert!(written.contains(&level), "torn read: {level}");
                        }
                    }
                })
            };

            for w in writers {
                w.join().unwrap();
            }
            reader.join().unwrap();
            let last = f.level().unwrap();
            prop_assert!(written.contains(&last));
        }
    }
}
