//! Scripted bus transport and simulated clock
//!
//! Replays a fixed sequence of frames per interface, advancing a shared
//! [`SimClock`] as the channel "waits", so collection windows can be
//! exercised without real delay or hardware.

use canquery_core::{Frame, FrameFilter};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::bus::{BusChannel, BusError, BusTransport};
use crate::clock::Clock;

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct SimClock {
    base: Instant,
    wall_base: DateTime<Utc>,
    elapsed: Rc<Cell<Duration>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            wall_base: Utc::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Total simulated time since creation
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed.get()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        self.wall_base + self.elapsed.get()
    }
}

/// One scripted bus event
#[derive(Debug, Clone)]
pub enum Scripted {
    /// A frame arriving `delay` after the previous event
    Frame { delay: Duration, frame: Frame },
    /// A transport failure on the next receive
    Fail(io::ErrorKind),
}

impl Scripted {
    pub fn frame(delay: Duration, frame: Frame) -> Self {
        Self::Frame { delay, frame }
    }

    pub fn fail(kind: io::ErrorKind) -> Self {
        Self::Fail(kind)
    }
}

#[derive(Debug, Default)]
struct Activity {
    opened: Vec<(String, FrameFilter)>,
    sent: Vec<(String, Frame)>,
    closed: Vec<String>,
    open_channels: usize,
}

/// Transport whose interfaces replay scripted traffic.
/// Interfaces without a script do not exist.
pub struct ScriptedTransport {
    clock: SimClock,
    scripts: HashMap<String, Vec<Scripted>>,
    open_failures: HashMap<String, io::ErrorKind>,
    apply_filter: bool,
    activity: Rc<RefCell<Activity>>,
}

impl ScriptedTransport {
    pub fn new(clock: &SimClock) -> Self {
        Self {
            clock: clock.clone(),
            scripts: HashMap::new(),
            open_failures: HashMap::new(),
            apply_filter: true,
            activity: Rc::new(RefCell::new(Activity::default())),
        }
    }

    /// Add an interface that replays `script` each time it is opened
    pub fn with_interface(mut self, interface: &str, script: Vec<Scripted>) -> Self {
        self.scripts.insert(interface.to_string(), script);
        self
    }

    /// Make opening an existing interface fail with a transport error
    pub fn with_open_failure(mut self, interface: &str, kind: io::ErrorKind) -> Self {
        self.scripts.entry(interface.to_string()).or_default();
        self.open_failures.insert(interface.to_string(), kind);
        self
    }

    /// Deliver frames regardless of the receive filter
    pub fn deliver_unfiltered(mut self) -> Self {
        self.apply_filter = false;
        self
    }

    pub fn opened(&self) -> Vec<(String, FrameFilter)> {
        self.activity.borrow().opened.clone()
    }

    pub fn sent(&self) -> Vec<(String, Frame)> {
        self.activity.borrow().sent.clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.activity.borrow().closed.clone()
    }

    /// Channels opened and not yet dropped
    pub fn open_channels(&self) -> usize {
        self.activity.borrow().open_channels
    }
}

impl BusTransport for ScriptedTransport {
    type Channel = ScriptedChannel;

    fn open(&self, interface: &str, filter: FrameFilter) -> Result<ScriptedChannel, BusError> {
        let script = self
            .scripts
            .get(interface)
            .ok_or_else(|| BusError::not_found(interface))?;
        if let Some(kind) = self.open_failures.get(interface) {
            return Err(BusError::transport(interface, io::Error::from(*kind)));
        }

        let mut activity = self.activity.borrow_mut();
        activity.opened.push((interface.to_string(), filter));
        activity.open_channels += 1;

        Ok(ScriptedChannel {
            interface: interface.to_string(),
            filter: self.apply_filter.then_some(filter),
            clock: self.clock.clone(),
            pending: script.iter().cloned().collect(),
            activity: Rc::clone(&self.activity),
        })
    }
}

/// Channel opened by [`ScriptedTransport`]
#[derive(Debug)]
pub struct ScriptedChannel {
    interface: String,
    filter: Option<FrameFilter>,
    clock: SimClock,
    pending: VecDeque<Scripted>,
    activity: Rc<RefCell<Activity>>,
}

impl BusChannel for ScriptedChannel {
    fn send(&mut self, frame: &Frame) -> Result<(), BusError> {
        self.activity
            .borrow_mut()
            .sent
            .push((self.interface.clone(), *frame));
        Ok(())
    }

    fn receive(&mut self, max_wait: Duration) -> Result<Option<Frame>, BusError> {
        let mut budget = max_wait;
        loop {
            match self.pending.front_mut() {
                Some(Scripted::Fail(kind)) => {
                    let kind = *kind;
                    self.pending.pop_front();
                    return Err(BusError::transport(&self.interface, io::Error::from(kind)));
                }
                Some(Scripted::Frame { delay, frame }) if *delay <= budget => {
                    let frame = *frame;
                    self.clock.advance(*delay);
                    budget -= *delay;
                    self.pending.pop_front();
                    if self.filter.map_or(true, |f| f.matches(&frame)) {
                        return Ok(Some(frame));
                    }
                }
                Some(Scripted::Frame { delay, .. }) => {
                    *delay -= budget;
                    self.clock.advance(budget);
                    return Ok(None);
                }
                None => {
                    self.clock.advance(budget);
                    return Ok(None);
                }
            }
        }
    }
}

impl Drop for ScriptedChannel {
    fn drop(&mut self) {
        let mut activity = self.activity.borrow_mut();
        activity.closed.push(self.interface.clone());
        activity.open_channels -= 1;
    }
}
