use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use board_core::{
    AddSound, BlobKey, ClockEngine, Persistence, PlaybackEvent, PlaybackState, Session,
    SessionObserver, SessionWarning, SoundEntry, SoundId, SoundSource, TabId,
};

use crate::commands::{self, Action, HELP};
use crate::config::Config;
use crate::fetch::LocalFetcher;
use crate::keybindings;

/// How the playback clock moves.
pub enum Clock {
    /// Follows wall time; `wait` sleeps.
    Wall(Instant),
    /// Only `wait` moves it, instantly.
    Manual,
}

/// Collects what the session reports so it can be printed after each command.
struct Notices(Rc<RefCell<Vec<String>>>);

impl SessionObserver for Notices {
    fn on_playback(&mut self, sound: SoundId, event: PlaybackEvent) {
        if event == PlaybackEvent::Ended {
            self.0.borrow_mut().push(format!("{sound} finished"));
        }
    }

    fn on_warning(&mut self, warning: &SessionWarning) {
        let line = match warning {
            SessionWarning::Persistence(message) => format!("warning: not saved: {message}"),
            SessionWarning::PlaybackRejected { sound, reason } => {
                format!("warning: {sound} did not start: {reason}")
            }
        };
        self.0.borrow_mut().push(line);
    }
}

pub struct Shell<'a> {
    session: Session,
    engine: ClockEngine,
    config: &'a Config,
    clock: Clock,
    notices: Rc<RefCell<Vec<String>>>,
}

impl<'a> Shell<'a> {
    pub fn new(
        mut session: Session,
        engine: ClockEngine,
        config: &'a Config,
        clock: Clock,
    ) -> Self {
        let notices = Rc::new(RefCell::new(Vec::new()));
        session.add_observer(Box::new(Notices(notices.clone())));
        Self {
            session,
            engine,
            config,
            clock,
            notices,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Read commands until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> anyhow::Result<()> {
        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                break;
            };
            let line = keybindings::expand(&line?);

            // Any input is a user gesture.
            self.engine.unlock();
            self.tick();
            self.flush_notices(out)?;
            if line.is_empty() {
                continue;
            }

            let action = match commands::parse(&line) {
                Ok(action) => action,
                Err(e) => {
                    writeln!(out, "error: {e:#}")?;
                    continue;
                }
            };

            match action {
                Action::Quit => break,
                Action::ClearTab(tab) => {
                    let tab = tab.map(TabId).unwrap_or(self.session.active_tab_id());
                    let Some(name) = self.session.tab(tab).map(|t| t.name().to_string()) else {
                        writeln!(out, "error: {tab} not found")?;
                        continue;
                    };
                    write!(out, "clear every sound from '{name}'? [y/N] ")?;
                    out.flush()?;
                    let answer = lines.next().transpose()?.unwrap_or_default();
                    if answer.trim().eq_ignore_ascii_case("y") {
                        let removed = self.session.clear_tab(tab)?;
                        writeln!(out, "removed {removed} sounds")?;
                    } else {
                        writeln!(out, "kept")?;
                    }
                }
                action => {
                    if let Err(e) = self.execute(action, out) {
                        writeln!(out, "error: {e:#}")?;
                    }
                }
            }
            self.flush_notices(out)?;
        }
        Ok(())
    }

    fn execute(&mut self, action: Action, out: &mut impl Write) -> anyhow::Result<()> {
        let active = self.session.active_tab_id();
        match action {
            Action::Help => writeln!(out, "{HELP}")?,
            Action::Tabs => {
                for tab in self.session.tabs() {
                    let marker = if tab.id() == active { '*' } else { ' ' };
                    writeln!(
                        out,
                        "{marker} [{}] {} ({} sounds)",
                        tab.id().0,
                        tab.name(),
                        tab.len()
                    )?;
                }
            }
            Action::NewTab(name) => {
                let id = self.session.create_tab(name.as_deref());
                writeln!(out, "created [{}]", id.0)?;
            }
            Action::UseTab(id) => self.session.set_active_tab(TabId(id))?,
            Action::RenameTab(id, name) => self.session.rename_tab(TabId(id), &name)?,
            Action::RemoveTab(id) => self.session.remove_tab(TabId(id))?,
            Action::List => {
                let tab = self.session.active_tab();
                writeln!(out, "{}", tab.name())?;
                for sound in tab.sounds() {
                    writeln!(out, "{}", describe(sound))?;
                }
            }
            Action::Library => {
                for entry in self.session.library() {
                    let uses = self.session.count_references(&entry.key);
                    writeln!(out, "{}  {}  ({uses} uses)", entry.key, entry.name)?;
                }
            }
            Action::AddFile { path, quick } => {
                let source = SoundSource::from_path(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let id = self.session.add_sound(active, source, options(quick))?;
                self.report_added(id, out)?;
            }
            Action::AddUrl { url, quick } => {
                let persistence = if quick {
                    Persistence::Ephemeral
                } else {
                    Persistence::Durable
                };
                let id = self
                    .session
                    .import_url(active, &url, persistence, &LocalFetcher)?;
                self.report_added(id, out)?;
            }
            Action::Reuse(key) => {
                let source = SoundSource::Library(BlobKey::from(key));
                let id = self.session.add_sound(active, source, AddSound::durable())?;
                self.report_added(id, out)?;
            }
            Action::RemoveSound(id) => {
                let sound = SoundId(id);
                let tab = self.session.tab_of(sound).unwrap_or(active);
                self.session.remove_sound(tab, sound)?;
            }
            Action::RenameSound(id, name) => {
                let sound = SoundId(id);
                let tab = self.session.tab_of(sound).unwrap_or(active);
                self.session.rename_sound(tab, sound, &name)?;
            }
            Action::Play(id) => self.session.play(SoundId(id))?,
            Action::Pause(id) => self.session.pause(SoundId(id))?,
            Action::Stop(id) => self.session.stop(SoundId(id))?,
            Action::Seek(id, delta) => {
                let position = self.session.seek_relative(SoundId(id), delta)?;
                writeln!(out, "at {position:.1}s")?;
            }
            Action::Back(id, step) => {
                let seconds = self.config.skip_step(step);
                let position = self.session.skip_back(SoundId(id), seconds)?;
                writeln!(out, "at {position:.1}s")?;
            }
            Action::Volume(id, percent) => {
                let effective = self.session.set_sound_volume(SoundId(id), percent)?;
                writeln!(out, "effective volume {:.0}%", effective * 100.0)?;
            }
            Action::Master(percent) => {
                let master = self.session.set_master_volume(percent);
                writeln!(out, "master volume {:.0}%", master * 100.0)?;
            }
            Action::Loop(id) => {
                let looping = self.session.toggle_loop(SoundId(id))?;
                writeln!(out, "loop {}", if looping { "on" } else { "off" })?;
            }
            Action::StopAll => self.session.stop_all(),
            Action::Wait(seconds) => self.wait(seconds, out)?,
            Action::Save => {
                self.session.save()?;
                writeln!(out, "saved")?;
            }
            Action::Quit | Action::ClearTab(_) => {}
        }
        Ok(())
    }

    fn report_added(&self, id: SoundId, out: &mut impl Write) -> anyhow::Result<()> {
        if let Some(sound) = self.session.sound(id) {
            writeln!(out, "added {}", describe(sound))?;
        }
        Ok(())
    }

    /// Advance the engine to wall time and deliver its events.
    fn tick(&mut self) {
        if let Clock::Wall(last) = &mut self.clock {
            let now = Instant::now();
            self.engine.advance(now.duration_since(*last).as_secs_f64());
            *last = now;
        }
        self.session.pump_events();
    }

    fn wait(&mut self, seconds: f64, out: &mut impl Write) -> anyhow::Result<()> {
        let interval = Duration::from_millis(self.config.progress_interval_ms.max(1));
        let mut remaining = seconds;
        while remaining > 0.0 {
            let step = remaining.min(interval.as_secs_f64());
            match self.clock {
                Clock::Wall(_) => std::thread::sleep(Duration::from_secs_f64(step)),
                Clock::Manual => self.engine.advance(step),
            }
            self.tick();
            remaining -= step;
        }

        for tab in self.session.tabs() {
            for sound in tab.sounds() {
                if sound.state() == PlaybackState::Playing {
                    writeln!(out, "{}", describe(sound))?;
                }
            }
        }
        Ok(())
    }

    fn flush_notices(&self, out: &mut impl Write) -> std::io::Result<()> {
        for line in self.notices.borrow_mut().drain(..) {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

fn options(quick: bool) -> AddSound {
    if quick {
        AddSound::ephemeral()
    } else {
        AddSound::durable()
    }
}

fn describe(sound: &SoundEntry) -> String {
    let state = match sound.state() {
        PlaybackState::Stopped => "stopped",
        PlaybackState::Playing => "playing",
        PlaybackState::Paused => "paused",
    };
    let mut line = format!(
        "  [{}] {}  vol {:.0}%  {state} {:.1}/{:.1}s",
        sound.id().0,
        sound.name(),
        sound.volume() * 100.0,
        sound.position(),
        sound.duration()
    );
    if sound.looping() {
        line.push_str("  loop");
    }
    if sound.persistence() == Persistence::Ephemeral {
        line.push_str("  (quick)");
    }
    line
}
