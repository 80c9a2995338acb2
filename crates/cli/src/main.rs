//! UpNext CLI - adaptive learning roadmaps, career timelines and reminders.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upnext_ai::{
    AgentOutcome, AgentTask, ContentGenerator, HttpContentGenerator, Navigator,
    StaticContentGenerator,
};
use upnext_core::{
    CareerGoal, Channel, Dependency, DependencyKind, MilestoneId, MilestonePatch, MilestoneSpec,
    MilestoneStatus, MilestoneType, NotificationSpec, Time, UserId, UserProfile,
};
use upnext_notify::{
    spawn_event_listener, ChannelAdapters, CourseSnapshot, LoggingAdapters,
    NotificationScheduler, ProjectSnapshot, SweepRunner, WebhookAdapters,
};
use upnext_progress::TimelineService;
use upnext_roadmap::{Catalog, CatalogKey, RoadmapService};
use upnext_storage::{JsonStorage, NotificationFilter, Storage, UserLocks};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "upnext")]
#[command(about = "Your AI career navigator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./upnext.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update a learner profile
    Init {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Phone number for SMS
        #[arg(long)]
        phone: Option<String>,
        /// Opt into SMS
        #[arg(long)]
        sms: bool,
        /// Opt out of email
        #[arg(long)]
        no_email: bool,
        /// Opt out of push
        #[arg(long)]
        no_push: bool,
        /// Weekly study hours
        #[arg(long, default_value = "10")]
        study_hours: u32,
    },
    /// Show or generate a learning roadmap
    Roadmap {
        #[command(subcommand)]
        action: RoadmapCommand,
    },
    /// Complete a roadmap task
    Complete {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Task id
        task: String,
        /// Self-reported mastery (1-5)
        #[arg(long)]
        mastery: u8,
        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Career timeline operations
    Timeline {
        #[command(subcommand)]
        action: TimelineCommand,
    },
    /// Milestone operations
    Milestone {
        #[command(subcommand)]
        action: MilestoneCommand,
    },
    /// Create a notification
    Notify {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Title
        #[arg(long)]
        title: String,
        /// Body
        #[arg(long)]
        message: String,
        /// Notification type
        #[arg(long, default_value = "reminder")]
        r#type: String,
        /// Priority
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Channels (comma separated); all when omitted
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,
        /// Delay delivery by this many minutes
        #[arg(long)]
        in_minutes: Option<i64>,
    },
    /// List a learner's notifications
    Inbox {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Only unread
        #[arg(long)]
        unread: bool,
        /// Maximum entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Mark notifications as read
    Read {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Notification id; all unread when omitted
        id: Option<String>,
    },
    /// Derive reminders and enqueue them
    Reminders {
        /// Learner id
        #[arg(long)]
        user: String,
        /// JSON file with `courses` and `projects` snapshots
        #[arg(long)]
        activity: Option<PathBuf>,
    },
    /// Ask for an evaluation, recommendations or encouragement
    Advise {
        /// Learner id
        #[arg(long)]
        user: String,
        #[command(subcommand)]
        kind: AdviseCommand,
    },
    /// Deliver every due notification once
    Sweep,
    /// Run the periodic sweep until interrupted
    Run,
}

#[derive(Subcommand)]
enum RoadmapCommand {
    /// Generate a roadmap from the catalog, replacing any existing one
    Start {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Target role
        #[arg(long)]
        role: String,
        /// Starting level
        #[arg(long, default_value = "beginner")]
        level: String,
        /// Role to use when the requested one is not in the catalog
        #[arg(long)]
        fallback_role: Option<String>,
    },
    /// Show the roadmap
    Show {
        /// Learner id
        #[arg(long)]
        user: String,
    },
    /// List catalog roles
    Roles,
}

#[derive(Subcommand)]
enum TimelineCommand {
    /// Create an empty timeline
    Create {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Target role
        #[arg(long)]
        role: String,
        /// Target company
        #[arg(long)]
        company: Option<String>,
        /// Timeframe ("6 months")
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Add generated milestone suggestions
    Generate {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Target role used when no timeline exists yet
        #[arg(long)]
        role: String,
        /// Timeframe ("6 months")
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Show the timeline
    Show {
        /// Learner id
        #[arg(long)]
        user: String,
    },
    /// Show prerequisite blockers
    Blockers {
        /// Learner id
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum MilestoneCommand {
    /// Add a milestone
    Add {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Title
        #[arg(long)]
        title: String,
        /// Type: course, project, certificate, mentor, custom
        #[arg(long, default_value = "custom")]
        r#type: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
        /// Estimated hours
        #[arg(long)]
        hours: Option<f32>,
        /// Prerequisite milestone ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        requires: Vec<String>,
    },
    /// Update a milestone
    Update {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Milestone id
        id: String,
        /// New status
        #[arg(long)]
        status: Option<String>,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Completion percentage
        #[arg(long)]
        progress: Option<u8>,
        /// Hours spent so far
        #[arg(long)]
        actual_hours: Option<f32>,
        /// New target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
    },
    /// Delete a milestone
    Delete {
        /// Learner id
        #[arg(long)]
        user: String,
        /// Milestone id
        id: String,
    },
}

#[derive(Subcommand)]
enum AdviseCommand {
    /// Evaluate progress
    Evaluate,
    /// Recommend next steps
    Recommend,
    /// A motivational message
    Motivate,
}

/// Activity snapshots read by `reminders --activity`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActivityFile {
    courses: Vec<CourseSnapshot>,
    projects: Vec<ProjectSnapshot>,
}

/// Services wired over one storage root.
struct App {
    storage: Arc<dyn Storage>,
    catalog: Arc<Catalog>,
    roadmaps: RoadmapService,
    timelines: Arc<TimelineService>,
    scheduler: Arc<NotificationScheduler>,
    navigator: Navigator,
}

impl App {
    /// Build the services. The returned handle finishes once `App` is dropped.
    async fn build(config: &Config) -> Result<(Self, JoinHandle<()>)> {
        let storage: Arc<dyn Storage> = Arc::new(
            JsonStorage::new(&config.storage_path)
                .await
                .with_context(|| format!("failed to open {}", config.storage_path.display()))?,
        );

        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path).await?,
            None => Catalog::builtin(),
        };
        let catalog = Arc::new(catalog);

        let adapters: Arc<dyn ChannelAdapters> = match &config.webhooks {
            Some(webhooks) => Arc::new(WebhookAdapters::new(
                webhooks.clone(),
                config.scheduler.channel_timeout(),
            )),
            None => Arc::new(LoggingAdapters),
        };
        let generator: Arc<dyn ContentGenerator> = match &config.generator {
            Some(generator) => Arc::new(HttpContentGenerator::new(generator.clone())),
            None => Arc::new(StaticContentGenerator::new()),
        };

        let locks = UserLocks::default();
        let scheduler = Arc::new(NotificationScheduler::new(
            storage.clone(),
            adapters,
            config.scheduler.clone(),
        ));
        let timelines = Arc::new(TimelineService::new(storage.clone(), locks.clone()));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let listener = spawn_event_listener(scheduler.clone(), events_rx);
        let roadmaps =
            RoadmapService::new(storage.clone(), catalog.clone(), locks).with_events(events_tx);

        let navigator = Navigator::new(
            storage.clone(),
            generator,
            timelines.clone(),
            scheduler.clone(),
        );

        Ok((
            Self {
                storage,
                catalog,
                roadmaps,
                timelines,
                scheduler,
                navigator,
            },
            listener,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let (app, listener) = App::build(&config).await?;

    run(&app, cli.command).await?;

    // Closing the event channel lets pending follow-up reminders finish.
    drop(app);
    listener.await?;
    Ok(())
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Init {
            user,
            name,
            email,
            phone,
            sms,
            no_email,
            no_push,
            study_hours,
        } => {
            let mut profile = UserProfile::new(UserId::new(user), name);
            profile.email = email;
            profile.phone = phone;
            profile.preferences.sms = sms;
            profile.preferences.email = !no_email;
            profile.preferences.push = !no_push;
            profile.preferences.study_hours_per_week = study_hours;
            app.storage.save_user(&profile).await?;
            println!("Saved learner {} ({})", profile.user_id, profile.name);
        }

        Commands::Roadmap { action } => match action {
            RoadmapCommand::Start {
                user,
                role,
                level,
                fallback_role,
            } => {
                let fallback = fallback_role.map(|r| CatalogKey::new(r, level.clone()));
                let roadmap = app
                    .roadmaps
                    .start(&UserId::new(user), &role, &level, fallback.as_ref())
                    .await?;
                print_roadmap(&roadmap);
            }
            RoadmapCommand::Show { user } => {
                let roadmap = app.roadmaps.roadmap(&UserId::new(user)).await?;
                print_roadmap(&roadmap);
            }
            RoadmapCommand::Roles => {
                for role in app.catalog.roles() {
                    println!("  {role}");
                }
            }
        },

        Commands::Complete {
            user,
            task,
            mastery,
            notes,
        } => {
            let task_id = task.parse().map_err(|_| anyhow!("Invalid task ID"))?;
            let roadmap = app
                .roadmaps
                .complete_task(&UserId::new(user), task_id, mastery, notes)
                .await?;
            print_roadmap(&roadmap);
        }

        Commands::Timeline { action } => match action {
            TimelineCommand::Create {
                user,
                role,
                company,
                timeframe,
            } => {
                let goal = CareerGoal {
                    target_role: role,
                    target_company: company,
                    timeframe,
                };
                let timeline = app.timelines.create_timeline(&UserId::new(user), goal).await?;
                print_timeline(&timeline);
            }
            TimelineCommand::Generate {
                user,
                role,
                timeframe,
            } => {
                let goal = CareerGoal {
                    target_role: role,
                    target_company: None,
                    timeframe,
                };
                let outcome = app
                    .navigator
                    .run(&UserId::new(user), AgentTask::GenerateTimeline { goal })
                    .await?;
                if let AgentOutcome::TimelineGenerated { timeline, added } = outcome {
                    println!("Added {} suggested milestones", added.len());
                    print_timeline(&timeline);
                }
            }
            TimelineCommand::Show { user } => {
                let timeline = app.timelines.timeline(&UserId::new(user)).await?;
                print_timeline(&timeline);
            }
            TimelineCommand::Blockers { user } => {
                let analysis = app.timelines.blockers(&UserId::new(user)).await?;
                println!(
                    "Blockers: {} ({} waiting, {} circular)",
                    analysis.stats.total_blockers,
                    analysis.stats.waiting,
                    analysis.stats.circular_dependencies
                );
                for blocker in &analysis.blockers {
                    println!("  {} | {} | {:?}", blocker.milestone_id, blocker.title, blocker.reason);
                }
                for suggestion in &analysis.suggestions {
                    println!("  -> [{}] {}", suggestion.action.as_str(), suggestion.description);
                }
            }
        },

        Commands::Milestone { action } => match action {
            MilestoneCommand::Add {
                user,
                title,
                r#type,
                description,
                target,
                hours,
                requires,
            } => {
                let dependencies = requires
                    .iter()
                    .map(|id| {
                        Ok(Dependency {
                            milestone_id: parse_milestone_id(id)?,
                            relation: DependencyKind::Prerequisite,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let spec = MilestoneSpec {
                    title,
                    milestone_type: Some(r#type.parse::<MilestoneType>()?),
                    description,
                    target_date: target.as_deref().map(parse_date).transpose()?,
                    estimated_hours: hours,
                    dependencies,
                    ..Default::default()
                };
                let milestone = app.timelines.add_milestone(&UserId::new(user), spec).await?;
                println!("Added milestone {} - {}", milestone.id, milestone.title);
            }
            MilestoneCommand::Update {
                user,
                id,
                status,
                title,
                progress,
                actual_hours,
                target,
            } => {
                let patch = MilestonePatch {
                    status: status.as_deref().map(str::parse::<MilestoneStatus>).transpose()?,
                    title,
                    completion_percentage: progress,
                    actual_hours,
                    target_date: target.as_deref().map(parse_date).transpose()?,
                    ..Default::default()
                };
                let milestone = app
                    .timelines
                    .update_milestone(&UserId::new(user), parse_milestone_id(&id)?, patch)
                    .await?;
                println!(
                    "Milestone {} - {} [{}] {}%",
                    milestone.id,
                    milestone.title,
                    milestone.status.as_str(),
                    milestone.completion_percentage
                );
            }
            MilestoneCommand::Delete { user, id } => {
                let id = parse_milestone_id(&id)?;
                app.timelines.delete_milestone(&UserId::new(user), id).await?;
                println!("Deleted milestone {id}");
            }
        },

        Commands::Notify {
            user,
            title,
            message,
            r#type,
            priority,
            channels,
            in_minutes,
        } => {
            let mut spec = NotificationSpec::new(UserId::new(user), parse_enum(&r#type)?, title, message);
            spec.priority = parse_enum(&priority)?;
            if !channels.is_empty() {
                spec.channels = Some(
                    channels
                        .iter()
                        .map(|c| c.parse::<Channel>())
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                );
            }
            spec.scheduled_for = in_minutes
                .map(|m| {
                    chrono::Duration::try_minutes(m)
                        .and_then(|delay| Utc::now().checked_add_signed(delay))
                        .ok_or_else(|| anyhow!("delay of {m} minutes is out of range"))
                })
                .transpose()?;

            let notification = app.scheduler.create_notification(spec).await?;
            println!("Created notification {}", notification.id);
            for (channel, state) in &notification.channels {
                let status = match (state.sent, state.gave_up, &state.error) {
                    (true, _, _) => "sent".to_string(),
                    (_, true, _) => "gave up".to_string(),
                    (_, _, Some(error)) => format!("failed: {error}"),
                    _ => "pending".to_string(),
                };
                println!("  {channel}: {status}");
            }
        }

        Commands::Inbox {
            user,
            unread,
            limit,
        } => {
            let user = UserId::new(user);
            let filter = NotificationFilter {
                unread_only: unread,
                limit,
                ..Default::default()
            };
            let notifications = app.scheduler.list(&user, filter).await?;
            let unread_count = app.scheduler.unread_count(&user).await?;

            println!("Notifications ({}, {} unread)", notifications.len(), unread_count);
            for n in notifications {
                println!(
                    "  {} {} | {} | {:?} | {}",
                    if n.in_app.read { " " } else { "*" },
                    n.id,
                    n.scheduled_for.format("%Y-%m-%d %H:%M"),
                    n.priority,
                    n.title,
                );
            }
        }

        Commands::Read { user, id } => {
            let user = UserId::new(user);
            match id {
                Some(id) => {
                    let id = id.parse().map_err(|_| anyhow!("Invalid notification ID"))?;
                    app.scheduler.mark_read(&user, id).await?;
                    println!("Marked {id} as read");
                }
                None => {
                    let count = app.scheduler.mark_all_read(&user).await?;
                    println!("Marked {count} notifications as read");
                }
            }
        }

        Commands::Reminders { user, activity } => {
            let activity = match activity {
                Some(path) => {
                    let content = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    serde_json::from_str(&content)
                        .with_context(|| format!("invalid activity file {}", path.display()))?
                }
                None => ActivityFile::default(),
            };
            let task = AgentTask::ScheduleReminders {
                courses: activity.courses,
                projects: activity.projects,
            };
            if let AgentOutcome::RemindersScheduled { created } =
                app.navigator.run(&UserId::new(user), task).await?
            {
                println!("Enqueued {} reminders", created.len());
                for n in created {
                    println!("  {} | {:?} | {}", n.id, n.priority, n.title);
                }
            }
        }

        Commands::Advise { user, kind } => {
            let user = UserId::new(user);
            let output = match kind {
                AdviseCommand::Evaluate => {
                    serde_json::to_string_pretty(&app.navigator.evaluate_progress(&user).await?)?
                }
                AdviseCommand::Recommend => serde_json::to_string_pretty(
                    &app.navigator.recommend_next_steps(&user).await?,
                )?,
                AdviseCommand::Motivate => app.navigator.motivation(&user).await?.message,
            };
            println!("{output}");
        }

        Commands::Sweep => {
            let report = app.scheduler.sweep(Utc::now()).await?;
            println!(
                "Processed {} notifications: {} sent, {} failed",
                report.processed, report.sent, report.failed
            );
        }

        Commands::Run => {
            let (runner, shutdown) = SweepRunner::new(app.scheduler.clone());
            let handle = runner.run();
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            shutdown.send(true)?;
            handle.await?;
        }
    }

    Ok(())
}

fn parse_milestone_id(id: &str) -> Result<MilestoneId> {
    id.parse().map_err(|_| anyhow!("Invalid milestone ID: {id}"))
}

fn parse_date(s: &str) -> Result<Time> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
        .ok_or_else(|| anyhow!("invalid date '{s}'"))
}

/// Parse a snake_case enum name through its serde representation.
fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T> {
    let normalized = s.trim().to_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| anyhow!("unknown value '{s}'"))
}

fn print_roadmap(roadmap: &upnext_core::Roadmap) {
    println!(
        "Roadmap: {} ({}) - {}% ready",
        roadmap.target_role, roadmap.level, roadmap.completion_percentage
    );
    for task in &roadmap.tasks {
        println!(
            "  {:>2}. {} | {:<11} | {} | {}",
            task.sequence_position,
            task.id,
            task.status.as_str(),
            task.category,
            task.title,
        );
    }
}

fn print_timeline(timeline: &upnext_core::Timeline) {
    println!(
        "Timeline: {} - {}% complete",
        timeline.career_goal.target_role, timeline.overall_progress
    );
    if let Some(eta) = timeline.estimated_completion {
        println!("  Estimated completion: {}", eta.format("%Y-%m-%d"));
    }
    for m in &timeline.milestones {
        println!(
            "  {} | {:<11} | {:>3}% | {}{}",
            m.id,
            m.status.as_str(),
            m.completion_percentage,
            m.title,
            m.target_date
                .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
                .unwrap_or_default(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{NotificationPriority, NotificationType};

    #[test]
    fn test_parse_enum() {
        assert_eq!(parse_enum::<NotificationType>("Deadline").unwrap(), NotificationType::Deadline);
        assert_eq!(parse_enum::<NotificationPriority>("urgent").unwrap(), NotificationPriority::Urgent);
        assert!(parse_enum::<NotificationType>("party").is_err());
    }

    #[test]
    fn test_parse_date() {
        let t = parse_date("2026-12-01").unwrap();
        assert_eq!(t.format("%Y-%m-%dT%H:%M").to_string(), "2026-12-01T00:00");
        assert!(parse_date("12/01/2026").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "upnext", "milestone", "add", "--user", "u1", "--title", "SQL", "--type", "course",
            "--requires", "01ARZ3NDEKTSV4RRFFQ69G5FAV,01ARZ3NDEKTSV4RRFFQ69G5FAW",
        ])
        .unwrap();
        let Commands::Milestone {
            action: MilestoneCommand::Add { requires, .. },
        } = cli.command
        else {
            panic!("wrong command");
        };
        assert_eq!(requires.len(), 2);
    }
}
