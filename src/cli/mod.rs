pub mod report;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, Utc};
use chrono_english::{parse_date_string, Dialect};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::{Config, CONFIG_FILE_NAME},
    sync::reconciler::SyncReconciler,
    tracking::{
        store::Store,
        timestamp::{self, Instant},
    },
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

pub const STORE_FILE_NAME: &str = "frames.json";

#[derive(Parser, Debug)]
#[command(name = "Timeframe", version, long_about = None)]
#[command(about = "Tracks time spent on projects", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Store file. By default frames.json in the application directory")]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start tracking a project. Sub-projects are separated with '/'")]
    Start { project: String },
    #[command(about = "Stop the running project and record it as a frame")]
    Stop {
        #[arg(short, long, help = "Note attached to the frame")]
        message: Option<String>,
    },
    #[command(about = "Drop the running project without recording anything")]
    Cancel {},
    #[command(about = "Show the running project")]
    Status {},
    #[command(about = "List every project")]
    Projects {},
    #[command(about = "List every frame, oldest first")]
    Frames {},
    #[command(about = "Record a frame that wasn't tracked live")]
    Add {
        project: String,
        #[arg(
            long,
            help = "Start of the frame. Timestamps, RFC 3339 dates and phrases like \"1 hour ago\" work"
        )]
        from: String,
        #[arg(long, help = "End of the frame. Same formats as --from")]
        to: String,
        #[arg(short, long, help = "Note attached to the frame")]
        message: Option<String>,
    },
    #[command(about = "Push new frames to the remote server")]
    Sync {
        #[arg(long, help = "Also resend frames that were pushed before")]
        force: bool,
        #[arg(long, help = "Remote server url, overrides the config file")]
        remote_url: Option<String>,
        #[arg(long, help = "Remote server token, overrides the config file")]
        remote_token: Option<String>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let store_path = args.file.unwrap_or_else(|| app_dir.join(STORE_FILE_NAME));
    let mut store = Store::load(store_path, Box::new(DefaultClock)).await?;

    match args.commands {
        Commands::Start { project } => {
            let running = store.start(&project)?;
            store.save().await?;
            report::print_started(&running);
        }
        Commands::Stop { message } => {
            let closed = store.stop(message)?;
            store.save().await?;
            report::print_stopped(&closed);
        }
        Commands::Cancel {} => {
            let running = store.cancel()?;
            store.save().await?;
            report::print_cancelled(&running);
        }
        Commands::Status {} => report::print_status(store.current(), Utc::now()),
        Commands::Projects {} => report::print_projects(&store.projects()),
        Commands::Frames {} => report::print_frames(&store.frames()),
        Commands::Add {
            project,
            from,
            to,
            message,
        } => {
            store.add_frame(&project, parse_moment(&from)?, parse_moment(&to)?, message)?;
            store.save().await?;
        }
        Commands::Sync {
            force,
            remote_url,
            remote_token,
        } => {
            let config = Config::load(&app_dir.join(CONFIG_FILE_NAME)).await?;
            let remote = config.remote.with_overrides(remote_url, remote_token);
            let created = SyncReconciler::from_config(&remote)?
                .push(&mut store, force)
                .await?;
            store.save().await?;
            report::print_synced(&created);
        }
    }
    Ok(())
}

/// Reads a moment typed by the user, either in a form the store understands or as a phrase.
fn parse_moment(value: &str) -> Result<Instant> {
    if let Ok(instant) = timestamp::parse_str(value) {
        return Ok(instant);
    }
    match parse_date_string(value, Local::now(), Dialect::Uk) {
        Ok(v) => Ok(timestamp::normalize(v.with_timezone(&Utc))),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value}: {e}"),
            )
            .into()),
    }
}
