//! telechat - line-mode BBS teleconference client
//!
//! Usage:
//!   telechat bbs.example.org 23 --user wanda
//!   telechat --bannerless
//!
//! Without a host argument the stored host is used, then the first entry
//! of the favorites list. Every host connected to is added to favorites.

mod render;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use telechat_core::session::telnet;
use telechat_core::{
    Client, DisplayEvent, ReconnectPolicy, Settings, Store, StreamProcessor,
};

use crate::render::Renderer;

const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "telechat")]
#[command(about = "Chat in BBS teleconference rooms over Telnet")]
#[command(version)]
struct Args {
    /// BBS host name, defaults to the last one used
    host: Option<String>,

    /// Telnet port
    port: Option<u16>,

    /// User name for auto-logon and directed-message detection
    #[arg(short, long)]
    user: Option<String>,

    /// Hide room banners, still tracking who is in the room
    #[arg(long)]
    bannerless: bool,

    /// Directory holding settings, chat history and triggers
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

enum Input {
    Line(String),
    Quit,
    Actions,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let root = args.data_dir.clone().unwrap_or_else(Store::default_root);
    let store = Store::new(root);
    let mut settings = merge_settings(store.settings(), args);
    if settings.host.is_empty() {
        use_first_favorite(&mut settings, &store.favorites());
    }
    if settings.host.is_empty() {
        bail!("no host given and none stored in {}", store.root().display());
    }
    if let Err(err) = store.save_settings(&settings) {
        warn!("failed to save settings: {err}");
    }

    let mut processor = StreamProcessor::new(settings.processor_options());
    processor.set_triggers(store.triggers());
    let mut client = Client::new(processor);
    let mut renderer =
        Renderer::new(io::stdout(), settings.username.clone(), Instant::now());

    let connected = client.connect(
        &telnet(),
        &settings.connect_target(),
        settings.connection_options(),
        ReconnectPolicy::default(),
    );
    drain(&mut client, &mut renderer, &store)?;
    connected.with_context(|| {
        format!("failed to connect to {}:{}", settings.host, settings.port)
    })?;
    remember_favorite(&store, &settings);

    let input = spawn_stdin_reader()?;
    while client.is_connected() {
        drain(&mut client, &mut renderer, &store)?;

        loop {
            match input.try_recv() {
                Ok(Input::Line(line)) => {
                    if let Err(err) = client.send_line(&line) {
                        warn!("failed to send line: {err}");
                    }
                },
                Ok(Input::Actions) => client.request_action_list(),
                Ok(Input::Quit) | Err(flume::TryRecvError::Disconnected) => {
                    client.disconnect();
                    break;
                },
                Err(flume::TryRecvError::Empty) => break,
            }
        }

        thread::sleep(TICK_INTERVAL);
    }

    drain(&mut client, &mut renderer, &store)?;
    info!("session ended");
    Ok(())
}

fn merge_settings(mut settings: Settings, args: Args) -> Settings {
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(user) = args.user {
        settings.username = user;
    }
    if args.bannerless {
        settings.bannerless = true;
    }
    settings
}

/// Take the host from the first usable favorites entry.
fn use_first_favorite(settings: &mut Settings, favorites: &[String]) {
    for entry in favorites {
        if settings.apply_favorite(entry) {
            info!("no host given, using favorite {entry}");
            return;
        }
        warn!("skipping unusable favorite {entry:?}");
    }
}

fn remember_favorite(store: &Store, settings: &Settings) {
    let mut favorites = store.favorites();
    if !add_favorite(&mut favorites, settings.favorite_entry()) {
        return;
    }
    if let Err(err) = store.save_favorites(&favorites) {
        warn!("failed to save favorites: {err}");
    }
}

fn add_favorite(favorites: &mut Vec<String>, entry: String) -> bool {
    if favorites.contains(&entry) {
        return false;
    }
    favorites.push(entry);
    true
}

/// Tick the client once, render what it produced and persist chat state.
fn drain(
    client: &mut Client,
    renderer: &mut Renderer<io::Stdout>,
    store: &Store,
) -> Result<()> {
    let now = Instant::now();
    for event in client.tick(now) {
        renderer.render(&event).context("failed to write to terminal")?;
        persist(store, &event);
    }
    renderer.tick(now).context("failed to write to terminal")?;
    Ok(())
}

fn persist(store: &Store, event: &DisplayEvent) {
    let result = match event {
        DisplayEvent::Chat(chat) => store
            .append_chat(chat)
            .and_then(|()| store.record_hyperlinks(&chat.urls)),
        DisplayEvent::RoomSnapshot(snapshot) => {
            store.record_members(snapshot, Local::now())
        },
        _ => Ok(()),
    };

    if let Err(err) = result {
        warn!("failed to persist chat state: {err}");
    }
}

fn spawn_stdin_reader() -> Result<flume::Receiver<Input>> {
    let (tx, rx) = flume::unbounded();
    thread::Builder::new()
        .name("telechat-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let input = match line.trim() {
                    "/quit" => Input::Quit,
                    "/actions" => Input::Actions,
                    _ => Input::Line(line),
                };
                if tx.send(input).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}
