use crate::connection::channel::ChannelMode;

/// Which publication stream a value is being considered for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    /// One-time full snapshot for a peer that just became ready
    Init,
    /// Reliable ordered stream, for rare or identity-like state
    Reliable,
    /// Best-effort stream, for per-tick continuous state
    Unreliable,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 3] = [
        ChannelKind::Init,
        ChannelKind::Reliable,
        ChannelKind::Unreliable,
    ];

    /// Transport channel this kind travels over
    pub fn mode(&self) -> ChannelMode {
        match self {
            ChannelKind::Init | ChannelKind::Reliable => ChannelMode::Reliable,
            ChannelKind::Unreliable => ChannelMode::Unreliable,
        }
    }

    fn bit(&self) -> u8 {
        match self {
            ChannelKind::Init => 0b001,
            ChannelKind::Reliable => 0b010,
            ChannelKind::Unreliable => 0b100,
        }
    }
}

/// Set of channel kinds a value is eligible for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ChannelKinds {
    bits: u8,
}

impl ChannelKinds {
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn of(kinds: &[ChannelKind]) -> Self {
        let mut output = Self::empty();
        for kind in kinds {
            output.insert(*kind);
        }
        output
    }

    pub fn insert(&mut self, kind: ChannelKind) {
        self.bits |= kind.bit();
    }

    pub fn remove(&mut self, kind: ChannelKind) {
        self.bits &= !kind.bit();
    }

    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.bits & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}
