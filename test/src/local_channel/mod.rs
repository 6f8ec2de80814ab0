//! In-memory channel pairs for E2E testing
//! Routes payloads between two sessions without any network I/O

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use replica_shared::{ChannelMode, DataChannel, PeerSession, TransportError};

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

struct LocalChannel {
    queue: Queue,
    open: Rc<Cell<bool>>,
}

impl DataChannel for LocalChannel {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.open.get() {
            return Err(TransportError::ChannelClosed);
        }
        self.queue.borrow_mut().push_back(payload.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.open.set(false);
    }
}

/// One direction of one channel
#[derive(Default)]
struct Lane {
    queue: Queue,
    open: Rc<Cell<bool>>,
}

impl Lane {
    fn channel(&self) -> Box<dyn DataChannel> {
        self.open.set(true);
        Box::new(LocalChannel {
            queue: self.queue.clone(),
            open: self.open.clone(),
        })
    }
}

fn lane_index(mode: ChannelMode) -> usize {
    match mode {
        ChannelMode::Reliable => 0,
        ChannelMode::Unreliable => 1,
    }
}

fn drain(queue: &Queue, mut receive: impl FnMut(&[u8])) -> usize {
    let mut count = 0;
    loop {
        let next = queue.borrow_mut().pop_front();
        let Some(payload) = next else {
            return count;
        };
        receive(&payload);
        count += 1;
    }
}

/// Link between two sessions, `a` and `b`. Each side is registered with the
/// other under its own name (`a_name`, `b_name`).
pub struct LocalLink {
    a_name: String,
    b_name: String,
    a_to_b: [Lane; 2],
    b_to_a: [Lane; 2],
}

impl LocalLink {
    pub fn new(a_name: &str, b_name: &str) -> Self {
        Self {
            a_name: a_name.to_string(),
            b_name: b_name.to_string(),
            a_to_b: Default::default(),
            b_to_a: Default::default(),
        }
    }

    /// Opens both channels on both sides
    pub fn connect(a_name: &str, a: &mut PeerSession, b_name: &str, b: &mut PeerSession) -> Self {
        let mut link = Self::new(a_name, b_name);
        for mode in ChannelMode::ALL {
            link.open(mode, a, b);
        }
        link
    }

    pub fn open(&mut self, mode: ChannelMode, a: &mut PeerSession, b: &mut PeerSession) {
        let index = lane_index(mode);
        a.on_channel_open(&self.b_name, mode.label(), self.a_to_b[index].channel());
        b.on_channel_open(&self.a_name, mode.label(), self.b_to_a[index].channel());
    }

    /// Tears a channel down the way a transport would report it
    pub fn close(&mut self, mode: ChannelMode, a: &mut PeerSession, b: &mut PeerSession) {
        let index = lane_index(mode);
        self.a_to_b[index].open.set(false);
        self.b_to_a[index].open.set(false);
        a.on_channel_close(&self.b_name, mode.label());
        b.on_channel_close(&self.a_name, mode.label());
    }

    /// Hands every queued payload to the receiving session. Returns how many
    /// were delivered.
    pub fn deliver(&mut self, a: &mut PeerSession, b: &mut PeerSession) -> usize {
        let mut delivered = 0;
        for mode in ChannelMode::ALL {
            let index = lane_index(mode);
            delivered += drain(&self.a_to_b[index].queue, |payload| {
                b.on_data(&self.a_name, mode.label(), payload)
            });
            delivered += drain(&self.b_to_a[index].queue, |payload| {
                a.on_data(&self.b_name, mode.label(), payload)
            });
        }
        delivered
    }

    /// Payloads `a` sent on `mode` that were not delivered yet
    pub fn pending_from_a(&self, mode: ChannelMode) -> usize {
        self.a_to_b[lane_index(mode)].queue.borrow().len()
    }

    pub fn pending_from_b(&self, mode: ChannelMode) -> usize {
        self.b_to_a[lane_index(mode)].queue.borrow().len()
    }

    /// Loses everything `a` queued on `mode`
    pub fn drop_from_a(&mut self, mode: ChannelMode) {
        self.a_to_b[lane_index(mode)].queue.borrow_mut().clear();
    }

    /// Reverses what `a` queued on `mode`, as an unreliable transport may
    pub fn reorder_from_a(&mut self, mode: ChannelMode) {
        let mut queue = self.a_to_b[lane_index(mode)].queue.borrow_mut();
        let reversed: VecDeque<Vec<u8>> = queue.drain(..).rev().collect();
        *queue = reversed;
    }
}
