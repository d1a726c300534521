use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use board_transport::{Command, MediaSource, PlaybackEvent};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;
/// Slots kept free for Started/Paused/Ended so progress spam cannot starve them.
const DISCRETE_EVENT_RESERVE: usize = 8;

#[derive(Debug, Clone, thiserror::Error)]
#[error("playback rejected: {reason}")]
pub struct PlaybackRejected {
    pub reason: String,
}

/// One playable instance of a payload.
///
/// Volume and loop are the only properties the session pushes; everything
/// else is transport control. Every `pause` is acknowledged with exactly one
/// [`PlaybackEvent::Paused`], whether or not the voice was playing, and no
/// command is ever dropped.
pub trait PlaybackHandle {
    fn play(&mut self) -> Result<(), PlaybackRejected>;
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, gain: f32);
    fn set_loop(&mut self, looping: bool);

    fn volume(&self) -> f32;
    fn looping(&self) -> bool;
    /// Last known position in seconds.
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;

    /// Drain pending events in the order the voice produced them.
    fn poll_events(&mut self) -> Vec<PlaybackEvent>;
}

pub trait PlaybackEngine {
    fn load(&mut self, source: &MediaSource) -> anyhow::Result<Box<dyn PlaybackHandle>>;
}

/// Parameters the handle writes and the voice reads on every step. Only the
/// latest value matters, so they bypass the command queue.
struct Params {
    gain: AtomicU32,
    looping: AtomicBool,
}

impl Params {
    fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }
}

struct Voice {
    commands: rtrb::Consumer<Command>,
    events: rtrb::Producer<PlaybackEvent>,
    /// Discrete events that found the queue full; sent before anything newer.
    overflow: VecDeque<PlaybackEvent>,
    params: Arc<Params>,
    playing: bool,
    position: f64,
    duration: f64,
}

impl Voice {
    fn emit(&mut self, event: PlaybackEvent) {
        if matches!(event, PlaybackEvent::ProgressAdvanced { .. }) {
            if self.overflow.is_empty() && self.events.slots() > DISCRETE_EVENT_RESERVE {
                let _ = self.events.push(event);
            }
            return;
        }
        if !self.overflow.is_empty() {
            self.overflow.push_back(event);
            return;
        }
        if let Err(rtrb::PushError::Full(event)) = self.events.push(event) {
            self.overflow.push_back(event);
        }
    }

    fn flush_overflow(&mut self) {
        while let Some(event) = self.overflow.pop_front() {
            if let Err(rtrb::PushError::Full(event)) = self.events.push(event) {
                self.overflow.push_front(event);
                return;
            }
        }
    }

    fn progress(&mut self) {
        self.emit(PlaybackEvent::ProgressAdvanced {
            current: self.position,
            total: self.duration,
        });
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Play => {
                if !self.playing {
                    self.playing = true;
                    self.emit(PlaybackEvent::Started);
                }
            }
            Command::Pause => {
                self.playing = false;
                self.emit(PlaybackEvent::Paused);
            }
            Command::Seek { seconds } => {
                // Seeking past the end while paused parks at the end; a playing
                // voice finishes on its next step.
                self.position = if self.playing {
                    seconds.max(0.0)
                } else {
                    seconds.clamp(0.0, self.duration)
                };
                self.progress();
            }
        }
    }

    fn step(&mut self, dt: f64) {
        self.flush_overflow();
        while let Ok(command) = self.commands.pop() {
            self.apply(command);
        }

        if !self.playing {
            return;
        }

        self.position += dt;
        if self.position < self.duration {
            self.progress();
            return;
        }

        if self.params.looping.load(Ordering::Acquire) && self.duration > 0.0 {
            self.position %= self.duration;
            self.progress();
        } else {
            self.playing = false;
            self.position = 0.0;
            self.emit(PlaybackEvent::Ended);
        }
    }
}

/// Headless engine whose voices advance only when the caller moves the clock.
///
/// Handles and voices talk over lock-free ring buffers, so the clock can be
/// driven from a different thread than the one owning the handles. A voice is
/// discarded once its handle is dropped.
#[derive(Clone)]
pub struct ClockEngine {
    voices: Arc<Mutex<Vec<Voice>>>,
    unlocked: Arc<AtomicBool>,
}

impl ClockEngine {
    /// An engine that refuses to start playback until [`ClockEngine::unlock`]
    /// is called, the way a browser waits for the first user gesture.
    pub fn new() -> Self {
        Self {
            voices: Arc::new(Mutex::new(Vec::new())),
            unlocked: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn unlocked() -> Self {
        let engine = Self::new();
        engine.unlock();
        engine
    }

    pub fn unlock(&self) {
        self.unlocked.store(true, Ordering::Release);
    }

    /// Move every voice forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        let Ok(mut voices) = self.voices.lock() else {
            tracing::warn!("clock engine voice table poisoned");
            return;
        };
        voices.retain(|voice| !voice.commands.is_abandoned());
        for voice in voices.iter_mut() {
            voice.step(dt);
        }
    }

    /// Number of live voices, counting ones whose handle was dropped since the
    /// last [`ClockEngine::advance`].
    pub fn voice_count(&self) -> usize {
        self.voices.lock().map(|voices| voices.len()).unwrap_or(0)
    }

    /// Effective gain each voice is mixing at, in load order.
    pub fn voice_gains(&self) -> Vec<f32> {
        self.voices
            .lock()
            .map(|voices| voices.iter().map(|voice| voice.params.gain()).collect())
            .unwrap_or_default()
    }
}

impl Default for ClockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine for ClockEngine {
    fn load(&mut self, source: &MediaSource) -> anyhow::Result<Box<dyn PlaybackHandle>> {
        let info = board_decode::probe(source)?;

        let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(COMMAND_CAPACITY);
        let (event_tx, event_rx) = rtrb::RingBuffer::<PlaybackEvent>::new(EVENT_CAPACITY);
        let params = Arc::new(Params {
            gain: AtomicU32::new(1.0f32.to_bits()),
            looping: AtomicBool::new(false),
        });

        let voice = Voice {
            commands: command_rx,
            events: event_tx,
            overflow: VecDeque::new(),
            params: params.clone(),
            playing: false,
            position: 0.0,
            duration: info.duration_secs,
        };

        self.voices
            .lock()
            .map_err(|_| anyhow::anyhow!("clock engine voice table poisoned"))?
            .push(voice);

        tracing::debug!(
            duration = info.duration_secs,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "loaded voice"
        );

        Ok(Box::new(ClockHandle {
            commands: command_tx,
            backlog: VecDeque::new(),
            events: event_rx,
            params,
            unlocked: self.unlocked.clone(),
            position: 0.0,
            duration: info.duration_secs,
        }))
    }
}

pub struct ClockHandle {
    commands: rtrb::Producer<Command>,
    /// Commands waiting for room in the queue, oldest first.
    backlog: VecDeque<Command>,
    events: rtrb::Consumer<PlaybackEvent>,
    params: Arc<Params>,
    unlocked: Arc<AtomicBool>,
    position: f64,
    duration: f64,
}

impl ClockHandle {
    fn flush_backlog(&mut self) {
        while let Some(command) = self.backlog.pop_front() {
            if let Err(rtrb::PushError::Full(command)) = self.commands.push(command) {
                self.backlog.push_front(command);
                return;
            }
        }
    }

    fn send(&mut self, command: Command) {
        self.flush_backlog();
        if !self.backlog.is_empty() {
            self.queue(command);
            return;
        }
        if let Err(rtrb::PushError::Full(command)) = self.commands.push(command) {
            tracing::debug!(?command, "voice command queue full, holding command");
            self.queue(command);
        }
    }

    /// Hold a command for later. Back-to-back seeks collapse into the last one.
    fn queue(&mut self, command: Command) {
        if let (Command::Seek { .. }, Some(Command::Seek { .. })) = (command, self.backlog.back())
        {
            self.backlog.pop_back();
        }
        self.backlog.push_back(command);
    }
}

impl PlaybackHandle for ClockHandle {
    fn play(&mut self) -> Result<(), PlaybackRejected> {
        if !self.unlocked.load(Ordering::Acquire) {
            return Err(PlaybackRejected {
                reason: "playback requires a user gesture first".to_string(),
            });
        }
        self.send(Command::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.send(Command::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
        self.send(Command::Seek { seconds });
    }

    fn set_volume(&mut self, gain: f32) {
        self.params
            .gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    fn set_loop(&mut self, looping: bool) {
        self.params.looping.store(looping, Ordering::Release);
    }

    fn volume(&self) -> f32 {
        self.params.gain()
    }

    fn looping(&self) -> bool {
        self.params.looping.load(Ordering::Acquire)
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        self.flush_backlog();
        let mut events = Vec::new();
        while let Ok(event) = self.events.pop() {
            match event {
                PlaybackEvent::ProgressAdvanced { current, total } => {
                    self.position = current;
                    self.duration = total;
                }
                PlaybackEvent::Ended => self.position = 0.0,
                PlaybackEvent::Started | PlaybackEvent::Paused => {}
            }
            events.push(event);
        }
        events
    }
}
