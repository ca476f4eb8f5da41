mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use meetsched_core::{
    parse_date, CascadeReport, ResponseKind, Scheduler, SubmitOutcome, SweepReport,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meetsched")]
#[command(about = "Schedule meetings, track hosts and participants, and collect responses")]
struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage hosts
    Host {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Manage participants
    Participant {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Manage meetings
    Meeting {
        #[command(subcommand)]
        action: MeetingAction,
    },
    /// Record a participant's answer to a meeting (replaces an earlier answer)
    Respond {
        meeting_id: i64,
        participant_id: i64,
        /// "accepted" or "declined"
        response: String,
    },
    /// List the responses to one meeting
    Responses { meeting_id: i64 },
    /// Show every meeting with its host and responses
    Overview {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Remove records left dangling by older versions
    Repair,
}

#[derive(Subcommand)]
enum ContactAction {
    /// Add a new record
    Add {
        name: String,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Delete a record and everything that depends on it
    Delete { id: i64 },
    /// List all records
    List,
}

#[derive(Subcommand)]
enum MeetingAction {
    /// Schedule a meeting for an existing host
    Schedule {
        name: String,
        #[arg(long)]
        host: i64,
        #[arg(short, long)]
        location: String,
        /// Date in YYYY-MM-DD form
        #[arg(short, long)]
        date: String,
    },
    /// Delete a meeting and its responses
    Delete { id: i64 },
    /// List all meetings
    List,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Host { .. } => "host",
            Commands::Participant { .. } => "participant",
            Commands::Meeting { .. } => "meeting",
            Commands::Respond { .. } => "respond",
            Commands::Responses { .. } => "responses",
            Commands::Overview { .. } => "overview",
            Commands::Repair => "repair",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(cli.db.as_deref())?;
    if let Err(err) = meetsched_core::init_from_config(&cfg.log) {
        eprintln!("warning: logging disabled: {err}");
    }
    let mut scheduler = Scheduler::open(&cfg.store).context("Failed to open the meeting store")?;
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    match cli.command {
        Commands::Host { action } => cmd_host(&mut scheduler, action),
        Commands::Participant { action } => cmd_participant(&mut scheduler, action),
        Commands::Meeting { action } => cmd_meeting(&mut scheduler, action),
        Commands::Respond {
            meeting_id,
            participant_id,
            response,
        } => cmd_respond(&mut scheduler, meeting_id, participant_id, &response),
        Commands::Responses { meeting_id } => cmd_responses(&scheduler, meeting_id),
        Commands::Overview { json } => cmd_overview(&scheduler, json),
        Commands::Repair => cmd_repair(&mut scheduler),
    }
}

fn cmd_host(scheduler: &mut Scheduler, action: ContactAction) -> Result<()> {
    match action {
        ContactAction::Add { name, email } => {
            let id = scheduler.add_host(&name, email.as_deref())?;
            println!("Added host {id}");
        }
        ContactAction::Delete { id } => {
            let report = scheduler.delete_host(id)?;
            println!("Deleted host {id}");
            print_cascade(&report);
        }
        ContactAction::List => {
            for host in scheduler.list_hosts()? {
                println!("{:>4}  {}{}", host.id, host.name, email_suffix(&host.email));
            }
        }
    }
    Ok(())
}

fn cmd_participant(scheduler: &mut Scheduler, action: ContactAction) -> Result<()> {
    match action {
        ContactAction::Add { name, email } => {
            let id = scheduler.add_participant(&name, email.as_deref())?;
            println!("Added participant {id}");
        }
        ContactAction::Delete { id } => {
            let report = scheduler.delete_participant(id)?;
            println!("Deleted participant {id}");
            print_cascade(&report);
        }
        ContactAction::List => {
            for participant in scheduler.list_participants()? {
                println!(
                    "{:>4}  {}{}",
                    participant.id,
                    participant.name,
                    email_suffix(&participant.email)
                );
            }
        }
    }
    Ok(())
}

fn cmd_meeting(scheduler: &mut Scheduler, action: MeetingAction) -> Result<()> {
    match action {
        MeetingAction::Schedule {
            name,
            host,
            location,
            date,
        } => {
            let date = parse_date(&date)?;
            let id = scheduler.schedule_meeting(&name, host, &location, date)?;
            println!("Scheduled meeting {id}");
        }
        MeetingAction::Delete { id } => {
            let report = scheduler.delete_meeting(id)?;
            println!("Deleted meeting {id}");
            print_cascade(&report);
        }
        MeetingAction::List => {
            for meeting in scheduler.list_meetings()? {
                println!(
                    "{:>4}  {}  {} @ {} (host {})",
                    meeting.id, meeting.date, meeting.name, meeting.location, meeting.host_id
                );
            }
        }
    }
    Ok(())
}

fn cmd_respond(
    scheduler: &mut Scheduler,
    meeting_id: i64,
    participant_id: i64,
    response: &str,
) -> Result<()> {
    let kind = ResponseKind::parse(response)?;
    match scheduler.submit_response(meeting_id, participant_id, kind)? {
        SubmitOutcome::Created(id) => println!("Recorded response {id}: {kind}"),
        SubmitOutcome::Updated(id) => println!("Updated response {id}: {kind}"),
    }
    Ok(())
}

fn cmd_responses(scheduler: &Scheduler, meeting_id: i64) -> Result<()> {
    let entries = scheduler.responses_for(meeting_id)?;
    if entries.is_empty() {
        println!("No responses yet.");
    }
    for entry in entries {
        println!("  {}: {}", entry.participant_name, entry.response);
    }
    Ok(())
}

fn cmd_overview(scheduler: &Scheduler, json: bool) -> Result<()> {
    let overviews = scheduler.meeting_overviews()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&overviews)?);
        return Ok(());
    }
    if overviews.is_empty() {
        println!("No meetings scheduled.");
    }
    for overview in overviews {
        let meeting = &overview.meeting;
        println!(
            "{} | host: {} | {} | {}",
            meeting.name, overview.host_name, meeting.location, meeting.date
        );
        for entry in &overview.responses {
            println!("    {}: {}", entry.participant_name, entry.response);
        }
    }
    Ok(())
}

fn cmd_repair(scheduler: &mut Scheduler) -> Result<()> {
    let SweepReport {
        orphan_meetings,
        orphan_responses,
        duplicate_responses,
    } = scheduler.sweep_orphans()?;
    println!(
        "Removed {orphan_meetings} orphan meetings, {orphan_responses} orphan responses, \
         {duplicate_responses} duplicate responses"
    );
    Ok(())
}

fn print_cascade(report: &CascadeReport) {
    if report.meetings_removed > 0 || report.responses_removed > 0 {
        println!(
            "  also removed {} meetings and {} responses",
            report.meetings_removed, report.responses_removed
        );
    }
}

fn email_suffix(email: &Option<String>) -> String {
    email
        .as_deref()
        .map(|email| format!(" <{email}>"))
        .unwrap_or_default()
}
