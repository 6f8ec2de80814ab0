use std::{fmt, time::Duration};

use super::channel_kind::{ChannelKind, ChannelKinds};

/// Number of extra ticks an unreliable change keeps being resent, to paper
/// over packet loss without acks
pub const DEFAULT_REDUNDANCY: u64 = 3;

/// Publish again once `interval` has passed since the last publish, if
/// `predicate` holds for the current value
pub struct ConditionalInterval<T> {
    pub interval: Duration,
    pub predicate: Box<dyn Fn(&T) -> bool>,
}

/// Publication settings for one `ReplicatedValue`
pub struct ValueConfig<T> {
    pub(crate) channels: ChannelKinds,
    pub(crate) optional: bool,
    pub(crate) min_interval: Option<Duration>,
    pub(crate) refresh_interval: Option<Duration>,
    pub(crate) conditional_interval: Option<ConditionalInterval<T>>,
    pub(crate) redundancy: u64,
    pub(crate) equals: Option<Box<dyn Fn(&T, &T) -> bool>>,
}

impl<T> ValueConfig<T> {
    /// Reliable value: sent in the init snapshot and on the reliable stream
    pub fn reliable() -> Self {
        Self::with_channels(&[ChannelKind::Init, ChannelKind::Reliable])
    }

    /// Unreliable value: sent in the init snapshot and on the unreliable stream
    pub fn unreliable() -> Self {
        Self::with_channels(&[ChannelKind::Init, ChannelKind::Unreliable])
    }

    pub fn with_channels(kinds: &[ChannelKind]) -> Self {
        Self {
            channels: ChannelKinds::of(kinds),
            optional: false,
            min_interval: None,
            refresh_interval: None,
            conditional_interval: None,
            redundancy: DEFAULT_REDUNDANCY,
            equals: None,
        }
    }

    /// An optional value may stay unset without holding back a copy's readiness
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Never publish more often than this on any channel kind
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }

    /// Publish at least this often, changed or not
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn conditional_interval(
        mut self,
        interval: Duration,
        predicate: impl Fn(&T) -> bool + 'static,
    ) -> Self {
        self.conditional_interval = Some(ConditionalInterval {
            interval,
            predicate: Box::new(predicate),
        });
        self
    }

    pub fn redundancy(mut self, ticks: u64) -> Self {
        self.redundancy = ticks;
        self
    }

    /// Replace the type's default equality for change detection
    pub fn equals(mut self, equals: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.equals = Some(Box::new(equals));
        self
    }

    pub fn channels(&self) -> ChannelKinds {
        self.channels
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl<T> Default for ValueConfig<T> {
    fn default() -> Self {
        Self::reliable()
    }
}

impl<T> fmt::Debug for ValueConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueConfig")
            .field("channels", &self.channels)
            .field("optional", &self.optional)
            .field("min_interval", &self.min_interval)
            .field("refresh_interval", &self.refresh_interval)
            .field("conditional_interval", &self.conditional_interval.as_ref().map(|c| c.interval))
            .field("redundancy", &self.redundancy)
            .field("custom_equals", &self.equals.is_some())
            .finish()
    }
}
