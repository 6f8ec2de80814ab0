use std::collections::HashMap;

use log::trace;

use crate::{
    types::{SeqNum, SEQ_STEP},
    Instant,
};

use super::{channel_kind::ChannelKind, replicate::Replicate, value_config::ValueConfig};

/// When a value was last published on a given channel kind
#[derive(Clone, PartialEq)]
pub struct PublishRecord {
    pub seq_num: SeqNum,
    pub time: Instant,
}

/// One versioned field. Tracks the last accepted write, the seq at which the
/// content last actually changed, and a signed run-length of consecutive
/// changes (positive) or repeats (negative) used to decide when a flapping
/// value has settled enough for the reliable stream.
pub struct ReplicatedValue<T: Replicate> {
    value: Option<T>,
    seq_num: SeqNum,
    last_changed: SeqNum,
    consecutive_changes: i64,
    last_published: HashMap<ChannelKind, PublishRecord>,
    config: ValueConfig<T>,
}

impl<T: Replicate> ReplicatedValue<T> {
    pub fn new(config: ValueConfig<T>) -> Self {
        Self {
            value: None,
            seq_num: 0,
            last_changed: 0,
            consecutive_changes: 0,
            last_published: HashMap::new(),
            config,
        }
    }

    pub fn has(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn seq_num(&self) -> SeqNum {
        self.seq_num
    }

    pub fn last_changed(&self) -> SeqNum {
        self.last_changed
    }

    pub fn consecutive_changes(&self) -> i64 {
        self.consecutive_changes
    }

    pub fn last_published(&self, kind: ChannelKind) -> Option<&PublishRecord> {
        self.last_published.get(&kind)
    }

    pub fn config(&self) -> &ValueConfig<T> {
        &self.config
    }

    fn equals(&self, a: &T, b: &T) -> bool {
        match &self.config.equals {
            Some(equals) => equals(a, b),
            None => a.approx_eq(b),
        }
    }

    /// Write `value` at `seq_num`. Returns whether the content changed.
    /// Writes older than the stored seq are rejected.
    pub fn set(&mut self, value: T, seq_num: SeqNum) -> bool {
        if seq_num < self.seq_num {
            trace!(
                "rejecting stale write at seq {} (current {})",
                seq_num,
                self.seq_num
            );
            return false;
        }

        if seq_num - self.seq_num > SEQ_STEP {
            self.consecutive_changes = 0;
        }

        if let Some(current) = &self.value {
            if self.equals(current, &value) {
                if seq_num != self.seq_num {
                    self.consecutive_changes = if self.consecutive_changes > 0 {
                        -1
                    } else {
                        self.consecutive_changes - 1
                    };
                    self.seq_num = seq_num;
                }
                return false;
            }
        }

        if self.consecutive_changes < 0 || seq_num == self.seq_num {
            self.consecutive_changes = 1;
        } else {
            self.consecutive_changes += 1;
        }
        self.value = Some(value);
        self.seq_num = seq_num;
        self.last_changed = seq_num;
        true
    }

    /// Unconditionally overwrite value and seq, bypassing change detection
    pub fn rollback(&mut self, value: T, seq_num: SeqNum) {
        self.value = Some(value);
        self.seq_num = seq_num;
    }

    /// Whether the value changed since it was last published on `kind`. For
    /// the reliable kind the run must also have stabilized, so a value that
    /// flips every tick never reaches the reliable stream.
    pub fn changed(&self, kind: ChannelKind, seq_num: SeqNum) -> bool {
        let Some(record) = self.last_published.get(&kind) else {
            return false;
        };
        if seq_num < self.last_changed || self.last_changed <= record.seq_num {
            return false;
        }
        if kind == ChannelKind::Reliable {
            return self.consecutive_changes.abs() == 1;
        }
        true
    }

    pub fn should_publish(&self, kind: ChannelKind, seq_num: SeqNum, now: &Instant) -> bool {
        let Some(value) = &self.value else {
            return false;
        };
        if !self.config.channels.contains(kind) {
            return false;
        }
        let Some(record) = self.last_published.get(&kind) else {
            return true;
        };
        if kind == ChannelKind::Init {
            return true;
        }
        if kind == ChannelKind::Unreliable
            && seq_num.saturating_sub(self.last_changed) <= self.config.redundancy
        {
            return true;
        }

        let elapsed = record.time.elapsed(now);
        if let Some(min_interval) = self.config.min_interval {
            if elapsed < min_interval {
                return false;
            }
        }
        if let Some(refresh_interval) = self.config.refresh_interval {
            if elapsed >= refresh_interval {
                return true;
            }
        }
        if let Some(conditional) = &self.config.conditional_interval {
            if elapsed >= conditional.interval && (conditional.predicate)(value) {
                return true;
            }
        }
        self.changed(kind, seq_num)
    }

    /// If the value should go out on `kind`, record the publish and return it
    pub fn publish(&mut self, kind: ChannelKind, seq_num: SeqNum, now: &Instant) -> Option<&T> {
        if !self.should_publish(kind, seq_num, now) {
            return None;
        }
        self.last_published.insert(
            kind,
            PublishRecord {
                seq_num,
                time: now.clone(),
            },
        );
        self.value.as_ref()
    }

    /// Forget the value and all bookkeeping, keeping the config
    pub fn reset(&mut self) {
        self.value = None;
        self.seq_num = 0;
        self.last_changed = 0;
        self.consecutive_changes = 0;
        self.last_published.clear();
    }
}
