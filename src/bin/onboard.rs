use std::path::PathBuf;

use clap::Parser;
use profile_onboard::command::{Command, HELP, ReadTarget, parse_command};
use profile_onboard::error::Result;
use profile_onboard::event::{Event, EventHandler};
use profile_onboard::notify::{self, FeedEvent, FeedSender, NotificationFeed, NotificationKind};
use profile_onboard::onboard::{
    AccountField, AutosaveOutcome, Identity, LoadOutcome, OnboardConfig, OnboardError,
    OnboardingSession, create_store, sleep_until_due,
};
use profile_onboard::ui;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "profile-onboard")]
#[command(author, version, about = "Resumable professional profile onboarding")]
struct Args {
    /// Path to onboard config file (default: <config dir>/profile-onboard/onboard.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep progress in memory only
    #[arg(long)]
    dryrun: bool,

    /// Progress file, overriding the config
    #[arg(long)]
    store: Option<PathBuf>,

    /// Name of the signed-in user
    #[arg(long)]
    full_name: Option<String>,

    /// Email of the signed-in user
    #[arg(long)]
    email: Option<String>,

    /// Log file path (logging disabled if not specified)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging only if log file is specified; stdout belongs to the wizard
    if let Some(ref log_path) = args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .ok();

        if let Some(file) = file {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();

            info!("Starting profile-onboard");
        }
    }

    let result = run(args).await;
    if let Err(ref e) = result {
        error!("Onboard error: {}", e);
    }
    result
}

fn load_config(args: &Args) -> Result<OnboardConfig> {
    let mut config = match args.config {
        Some(ref path) => OnboardConfig::load_from(path)?,
        None => OnboardConfig::load()?,
    };

    // flags override config
    if args.dryrun {
        config.general.dryrun = true;
    }
    if let Some(ref path) = args.store {
        config.store.path = Some(path.clone());
    }
    if config.general.dryrun {
        warn!("Dry run: progress is kept in memory only");
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let identity = Identity {
        full_name: args.full_name.clone().unwrap_or_default(),
        email: args.email.clone().unwrap_or_default(),
    };

    let store = create_store(&config);
    let mut session = OnboardingSession::new(config, identity, store);

    let (feed_tx, mut feed_rx) = notify::channel();
    let mut feed = NotificationFeed::new();
    let _ = feed_tx.send(FeedEvent::Connecting);
    let _ = feed_tx.send(FeedEvent::Connected);

    match session.load().await {
        LoadOutcome::Resumed if session.is_completed() => {
            println!("Your profile is already complete.");
        }
        LoadOutcome::Resumed if session.has_progress() => {
            println!("Welcome back, picking up where you left off.");
        }
        LoadOutcome::Resumed | LoadOutcome::Fresh => {}
        LoadOutcome::Failed => {
            println!("Could not load saved progress, starting with an empty profile.");
        }
    }
    println!("{}", ui::render_session(&session.view()));
    println!("Type 'help' for commands.");

    let mut events = EventHandler::stdin();

    loop {
        tokio::select! {
            event = events.next() => {
                let line = match event {
                    Some(Event::Line(line)) => line,
                    Some(Event::Closed) | None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                execute(command, &mut session, &feed, &feed_tx).await;
            }
            _ = sleep_until_due(session.autosave_deadline()) => {
                match session.run_autosave().await {
                    AutosaveOutcome::Saved => println!("(autosaved)"),
                    AutosaveOutcome::Failed(reason) => {
                        let _ = feed_tx.send(FeedEvent::System {
                            title: "Autosave failed".to_string(),
                            message: reason,
                            kind: NotificationKind::Warning,
                        });
                    }
                    AutosaveOutcome::NotDue | AutosaveOutcome::Suppressed(_) => {}
                }
            }
        }

        feed.drain(&mut feed_rx);
    }

    // flush edits that are still waiting for the debounce
    if session.autosave_deadline().is_some() {
        info!("Saving pending edits before exit");
        if let AutosaveOutcome::Failed(reason) = flush(&mut session).await {
            println!("Unsaved changes could not be stored: {reason}");
        }
    }

    let _ = feed_tx.send(FeedEvent::Disconnected);
    info!("Exiting profile-onboard");
    Ok(())
}

async fn flush(session: &mut OnboardingSession) -> AutosaveOutcome {
    if let Some(deadline) = session.autosave_deadline() {
        tokio::time::sleep_until(deadline).await;
    }
    session.run_autosave().await
}

async fn execute(
    command: Command,
    session: &mut OnboardingSession,
    feed: &NotificationFeed,
    feed_tx: &FeedSender,
) {
    let result = match command {
        Command::Summary(text) => session.edit_field(AccountField::Summary, text),
        Command::Name(text) => session.edit_field(AccountField::FullName, text),
        Command::AddExperience => session.add_experience().map(|index| {
            println!("Added experience [{index}]");
        }),
        Command::RemoveExperience(index) => session.remove_experience(index).map(|_| ()),
        Command::SetExperience { index, patch } => session.update_experience(index, patch),
        Command::AddSkill(skill) => session.add_skill(&skill),
        Command::RemoveSkill(skill) => session.remove_skill(&skill).map(|removed| {
            if !removed {
                println!("No skill named \"{skill}\"");
            }
        }),
        Command::Next => session.go_next().await.map(|_| ()),
        Command::Back => session.go_back().await.map(|_| ()),
        Command::Finish => session
            .finish()
            .await
            .map(|profile| info!("Profile {} was created", profile.id)),
        Command::Show => Ok(()),
        Command::Inbox => {
            println!("{}", ui::render_feed(feed));
            return;
        }
        Command::Read(target) => {
            let event = match target {
                ReadTarget::All => FeedEvent::MarkAllRead,
                ReadTarget::One(id) => FeedEvent::MarkRead(id),
            };
            let _ = feed_tx.send(event);
            return;
        }
        Command::Clear => {
            session.clear_error();
            Ok(())
        }
        Command::Help => {
            println!("{HELP}");
            return;
        }
        // handled by the caller
        Command::Quit => return,
    };

    match session.take_message() {
        Some(message) => {
            println!("{}", ui::render_message(&message));
            let _ = feed_tx.send(FeedEvent::from(&message));
        }
        // errors that never reached a message, e.g. a completed session
        None => {
            if let Err(e) = result {
                println!("{e}");
            }
        }
    }
    println!("{}", ui::render_session(&session.view()));
}
