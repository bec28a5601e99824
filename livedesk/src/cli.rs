//! Command line surface

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use livedesk_core::bootstrap::Services;
use livedesk_core::codec::LiveConfigFields;
use livedesk_core::fabric::ObjectPermission;
use livedesk_core::models::{LibraryId, Retention};
use livedesk_core::service::{
    Confirmer, ConfigureOptions, CopyToVodOptions, CreateStreamRequest, DispatchOutcome, FollowUp,
    Operation, Prompt,
};
use livedesk_core::validation;
use livedesk_core::Config;
use tracing::info;

use crate::terminal::{TerminalConfirmer, TracingNotifier};

#[derive(Debug, Parser)]
#[command(name = "livedesk", version, about = "Operate live streams on the media fabric")]
pub struct Cli {
    /// Configuration file (defaults to LIVEDESK_CONFIG_PATH or ./config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List streams with their last known status
    List,
    /// Check one stream and print its record
    Status { slug: String },
    /// Create a stream object and link it from the site
    Create(CreateArgs),
    /// Push the stored config to the recorder and probe the source
    Configure {
        slug: String,
        /// Replace configured audio tracks with the probed ones
        #[arg(long)]
        sync_audio: bool,
    },
    Start { slug: String },
    Stop { slug: String },
    /// Reset the recording operation
    Reset { slug: String },
    /// Close the recording session
    Deactivate { slug: String },
    Delete { slug: String },
    /// List recording periods and whether they can be archived
    Periods { slug: String },
    /// Archive recording periods into a new VoD object
    CopyToVod(CopyArgs),
    /// Poll stream status until Ctrl-C
    Monitor,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub name: String,
    #[arg(long)]
    pub library: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Origin URL (srt, rtmp, udp, http)
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long, default_value = "clear")]
    pub encryption: String,
    /// Seconds of parts to keep, or "persistent"
    #[arg(long, default_value = "86400")]
    pub retention: String,
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long, default_value = "editable")]
    pub permission: ObjectPermission,
}

#[derive(Debug, Args)]
pub struct CopyArgs {
    pub slug: String,
    /// Period ids; several are copied as one continuous range
    #[arg(long = "period", required = true)]
    pub periods: Vec<u32>,
    #[arg(long)]
    pub library: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content_type: Option<String>,
    #[arg(long, default_value = "editable")]
    pub permission: ObjectPermission,
}

pub async fn run(command: Command, services: &Services, config: &Config, assume_yes: bool) -> Result<()> {
    let confirmer = Arc::new(TerminalConfirmer::new(assume_yes));
    let dispatch = services.dispatch(confirmer.clone(), Arc::new(TracingNotifier));
    let lifecycle = &services.lifecycle;

    match command {
        Command::List => {
            for stream in services.cache.snapshot() {
                let status = stream.status.map_or("unknown", |s| s.as_str());
                println!("{:<32} {:<14} {}", stream.slug, status, stream.title);
            }
        }
        Command::Status { slug } => {
            lifecycle.check(&slug).await?;
            let stream = services
                .cache
                .get(&slug)
                .with_context(|| format!("stream {slug} left the cache"))?;
            println!("{}", serde_json::to_string_pretty(&stream)?);
        }
        Command::Create(args) => {
            let request = create_request(args)?;
            let created = lifecycle.create(request).await?;
            println!("{} {}", created.slug, created.object_id);
        }
        Command::Configure { slug, sync_audio } => {
            let probe = lifecycle
                .configure(&slug, ConfigureOptions { sync_audio_with_probe: sync_audio })
                .await?;
            println!(
                "{slug}: {} video, {} audio stream(s)",
                probe.video_stream_count,
                probe.audio_streams.len()
            );
        }
        Command::Start { slug } => report(dispatch.dispatch(Operation::Start, &slug, FollowUp::None).await?),
        Command::Stop { slug } => report(dispatch.dispatch(Operation::Stop, &slug, FollowUp::None).await?),
        Command::Deactivate { slug } => {
            report(dispatch.dispatch(Operation::Deactivate, &slug, FollowUp::None).await?);
        }
        Command::Delete { slug } => report(dispatch.dispatch(Operation::Delete, &slug, FollowUp::None).await?),
        Command::Reset { slug } => {
            let prompt = Prompt {
                title: "Reset Stream".to_string(),
                message: format!("Reset the recording of {slug}?"),
                confirm_label: "Reset",
            };
            if confirmer.confirm(&prompt).await {
                let state = lifecycle.reset(&slug).await?;
                report(DispatchOutcome::Completed(state));
            }
        }
        Command::Periods { slug } => {
            for view in lifecycle.recording_periods(&slug).await? {
                let end = view
                    .period
                    .end_time
                    .map_or_else(|| "recording".to_string(), |t| t.to_string());
                println!(
                    "{:>3} {:>12} {:>12} {:?}",
                    view.period.id, view.period.start_time, end, view.availability
                );
            }
        }
        Command::CopyToVod(args) => {
            let views = lifecycle.recording_periods(&args.slug).await?;
            if let Some(message) = validation::validate_copy_selection(&views, &args.periods) {
                bail!(message);
            }
            let periods = views
                .into_iter()
                .filter(|view| args.periods.contains(&view.period.id))
                .map(|view| view.period)
                .collect();
            let outcome = lifecycle
                .copy_to_vod(
                    &args.slug,
                    CopyToVodOptions {
                        periods,
                        library_id: LibraryId::from_string(args.library),
                        title: args.title,
                        content_type: args.content_type,
                        permission: args.permission,
                    },
                )
                .await?;
            println!("{}", outcome.target_object_id);
        }
        Command::Monitor => {
            let handle = services.poller.spawn(config.poller.monitor_interval());
            info!(
                streams = services.cache.len(),
                interval_secs = config.poller.monitor_interval_seconds,
                "Monitoring, press Ctrl-C to stop"
            );
            tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
            handle.shutdown().await;
            info!("Monitor stopped");
        }
    }

    Ok(())
}

fn report(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Cancelled => println!("cancelled"),
        DispatchOutcome::Completed(Some(state)) => println!("{state}"),
        DispatchOutcome::Completed(None) => println!("done"),
    }
}

fn create_request(args: CreateArgs) -> Result<CreateStreamRequest> {
    if let Some(message) = validation::validate_retention(&args.retention) {
        bail!(message);
    }
    if let Some(message) = validation::validate_origin_url(args.url.as_deref()) {
        bail!(message);
    }
    let retention = Retention::parse(&args.retention).map_err(anyhow::Error::msg)?;

    Ok(CreateStreamRequest {
        name: args.name,
        display_title: args.title,
        description: args.description,
        library_id: LibraryId::from_string(args.library),
        permission: args.permission,
        live_config: LiveConfigFields {
            encryption: args.encryption,
            playout_profile: args.profile,
            retention,
            url: args.url,
            ..LiveConfigFields::default()
        },
    })
}
