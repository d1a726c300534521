use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};

pub const HELP: &str = "\
tabs                      list tabs
tab new [NAME]            create a tab and switch to it
tab use ID                switch tab
tab rename ID NAME        rename a tab
tab rm ID                 remove a tab and its sounds
clear [ID]                remove every sound from a tab (asks first)
ls                        list sounds in the active tab
library                   list stored payloads
add PATH [--quick]        add a local file (--quick: not kept after exit)
url URL [--quick]         add a sound from a URL
reuse KEY                 add another sound backed by a stored payload
rm ID | rename ID NAME    remove or rename a sound
play ID | pause ID | stop ID
seek ID SECONDS           jump forward or back
back ID [N]               skip back by the Nth configured step
vol ID PERCENT            per-sound volume
master PERCENT            master volume
loop ID                   toggle looping
stop-all                  stop everything (esc)
wait SECONDS              let time pass
save                      write the session now
quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Help,
    Quit,
    Tabs,
    NewTab(Option<String>),
    UseTab(u64),
    RenameTab(u64, String),
    RemoveTab(u64),
    ClearTab(Option<u64>),
    List,
    Library,
    AddFile { path: PathBuf, quick: bool },
    AddUrl { url: String, quick: bool },
    Reuse(String),
    RemoveSound(u64),
    RenameSound(u64, String),
    Play(u64),
    Pause(u64),
    Stop(u64),
    Seek(u64, f64),
    Back(u64, Option<usize>),
    Volume(u64, f64),
    Master(f64),
    Loop(u64),
    StopAll,
    Wait(f64),
    Save,
}

fn id(word: Option<&str>) -> anyhow::Result<u64> {
    let word = word.ok_or_else(|| anyhow!("missing id"))?;
    word.parse().with_context(|| format!("'{word}' is not an id"))
}

fn number(word: Option<&str>) -> anyhow::Result<f64> {
    let word = word.ok_or_else(|| anyhow!("missing number"))?;
    let value: f64 = word
        .parse()
        .with_context(|| format!("'{word}' is not a number"))?;
    if !value.is_finite() {
        bail!("'{word}' is not a number");
    }
    Ok(value)
}

/// Split `rest` into its text and whether it ended with `--quick`.
fn quick_flag(rest: &str) -> (String, bool) {
    match rest.trim().strip_suffix("--quick") {
        Some(text) => (text.trim().to_string(), true),
        None => (rest.trim().to_string(), false),
    }
}

/// The remainder of `line` after its first `n` words.
fn tail(line: &str, n: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..n {
        rest = match rest.split_once(char::is_whitespace) {
            Some((_, after)) => after.trim_start(),
            None => "",
        };
    }
    rest.trim_end()
}

pub fn parse(line: &str) -> anyhow::Result<Action> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        bail!("empty command");
    };

    let action = match verb {
        "help" => Action::Help,
        "quit" | "exit" => Action::Quit,
        "tabs" => Action::Tabs,
        "tab" => match words.next() {
            Some("new") => {
                let name = tail(line, 2);
                Action::NewTab((!name.is_empty()).then(|| name.to_string()))
            }
            Some("use") => Action::UseTab(id(words.next())?),
            Some("rename") => {
                let tab = id(words.next())?;
                Action::RenameTab(tab, tail(line, 3).to_string())
            }
            Some("rm") => Action::RemoveTab(id(words.next())?),
            Some(other) => bail!("unknown tab command '{other}'"),
            None => Action::Tabs,
        },
        "clear" => Action::ClearTab(words.next().map(|w| id(Some(w))).transpose()?),
        "ls" => Action::List,
        "library" => Action::Library,
        "add" => {
            let (path, quick) = quick_flag(tail(line, 1));
            if path.is_empty() {
                bail!("missing path");
            }
            Action::AddFile {
                path: PathBuf::from(path),
                quick,
            }
        }
        "url" => {
            let (url, quick) = quick_flag(tail(line, 1));
            if url.is_empty() {
                bail!("missing url");
            }
            Action::AddUrl { url, quick }
        }
        "reuse" => Action::Reuse(
            words
                .next()
                .ok_or_else(|| anyhow!("missing key"))?
                .to_string(),
        ),
        "rm" => Action::RemoveSound(id(words.next())?),
        "rename" => {
            let sound = id(words.next())?;
            Action::RenameSound(sound, tail(line, 2).to_string())
        }
        "play" => Action::Play(id(words.next())?),
        "pause" => Action::Pause(id(words.next())?),
        "stop" => Action::Stop(id(words.next())?),
        "seek" => {
            let sound = id(words.next())?;
            Action::Seek(sound, number(words.next())?)
        }
        "back" => {
            let sound = id(words.next())?;
            let step = words
                .next()
                .map(|w| w.parse::<usize>().with_context(|| format!("'{w}' is not a step")))
                .transpose()?;
            Action::Back(sound, step)
        }
        "vol" => {
            let sound = id(words.next())?;
            Action::Volume(sound, number(words.next())?)
        }
        "master" => Action::Master(number(words.next())?),
        "loop" => Action::Loop(id(words.next())?),
        "stop-all" => Action::StopAll,
        "wait" => Action::Wait(number(words.next())?.max(0.0)),
        "save" => Action::Save,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(action)
}
