//! `mindjoy`: command-line client for the Mindjoy API.
//!
//! # Usage
//!
//! ```
//! mindjoy --url http://localhost:8080 --owner 6f1c... tasks
//! mindjoy --config ~/.config/mindjoy/config.toml task add "Write report" --principle 3b2e...
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig, Applied, Collection};
use mindjoy_core::habit::{HabitRef, HabitType};
use serde::Deserialize;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mindjoy", about = "Command-line client for the Mindjoy API")]
struct Args {
  /// Path to a TOML config file (url, owner).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the mindjoy server (default: http://localhost:8080).
  #[arg(long, env = "MINDJOY_URL")]
  url: Option<String>,

  /// Owner id every request is scoped to.
  #[arg(long, env = "MINDJOY_OWNER")]
  owner: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the subscription status and write access.
  Status,
  /// Start (or restart) the free trial.
  Trial,
  /// Mark the owner as subscribed.
  Subscribe,
  /// List the tasks of a day (default: today).
  Tasks {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Change the tasks of a day.
  #[command(subcommand)]
  Task(TaskCommand),
  /// List goals.
  Goals {
    /// Only active goals, in order.
    #[arg(long)]
    active: bool,
  },
  #[command(subcommand)]
  Goal(GoalCommand),
  /// List principles.
  Principles,
  #[command(subcommand)]
  Principle(PrincipleCommand),
  /// Show the selected habits for a day (default: today).
  Habits {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  #[command(subcommand)]
  Habit(HabitCommand),
  /// Summarise completed tasks, all time or over `--start`/`--end`.
  Progress {
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    #[arg(long, requires = "start")]
    end:   Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
  Add {
    title:     String,
    #[arg(long)]
    principle: Uuid,
    #[arg(long)]
    goal:      Option<Uuid>,
    #[arg(long)]
    date:      Option<NaiveDate>,
  },
  /// Flip a task's completion.
  Done { id: Uuid },
  Promote { id: Uuid },
  Rm { id: Uuid },
  /// Set the full order of a day's tasks.
  Order {
    ids:  Vec<Uuid>,
    #[arg(long)]
    date: Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
  Add {
    title:       String,
    #[arg(long)]
    principle:   Uuid,
    #[arg(long)]
    description: Option<String>,
  },
  Activate { id: Uuid },
  Deactivate { id: Uuid },
  Achieve { id: Uuid },
  Rm { id: Uuid },
  /// Set the full order of the active goals.
  Order { ids: Vec<Uuid> },
}

#[derive(Subcommand, Debug)]
enum PrincipleCommand {
  Add {
    title:       String,
    #[arg(long)]
    description: Option<String>,
  },
  Promote { id: Uuid },
  Rm { id: Uuid },
  Order { ids: Vec<Uuid> },
}

#[derive(Subcommand, Debug)]
enum HabitCommand {
  /// Create a custom habit.
  Add { title: String },
  /// Rename a custom habit.
  Rename { id: Uuid, title: String },
  /// Delete a custom habit, dropping it from the selection too.
  Rm { id: Uuid },
  /// Replace the selection, e.g. `habit select system:<id> custom:<id>`.
  /// No habits clears it.
  Select {
    #[arg(value_parser = parse_habit_ref, value_name = "TYPE:ID")]
    habits: Vec<HabitRef>,
  },
  /// Flip a habit's completion for a day.
  Toggle {
    #[command(flatten)]
    habit: HabitArg,
    #[arg(long)]
    date:  Option<NaiveDate>,
  },
  /// Completion rate since the habit was selected.
  Rate {
    #[command(flatten)]
    habit: HabitArg,
  },
  /// Seven days starting at `start`.
  Week { start: NaiveDate },
}

#[derive(ClapArgs, Debug)]
struct HabitArg {
  /// `system` or `custom`.
  habit_type: HabitType,
  habit_id:   Uuid,
}

impl HabitArg {
  fn to_ref(&self) -> HabitRef { HabitRef::new(self.habit_type, self.habit_id) }
}

fn parse_habit_ref(raw: &str) -> Result<HabitRef, String> {
  let (kind, id) = raw
    .split_once(':')
    .ok_or_else(|| format!("expected TYPE:ID, got `{raw}`"))?;
  let kind: HabitType = kind
    .parse()
    .map_err(|_| format!("unknown habit type `{kind}`; use system or custom"))?;
  let id: Uuid = id.parse().map_err(|e| format!("bad habit id `{id}`: {e}"))?;
  Ok(HabitRef::new(kind, id))
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:   String,
  owner: Option<Uuid>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let Some(owner_id) = args.owner.or(file_cfg.owner) else {
    bail!("no owner given; pass --owner, set MINDJOY_OWNER, or add `owner` to the config file");
  };
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    owner_id,
  };

  let client = ApiClient::new(api_config)?;
  let output = run(&client, args.command).await?;
  println!("{output}");
  Ok(())
}

fn today() -> NaiveDate { Utc::now().date_naive() }

fn applied(result: Applied) -> String {
  format!("{} position(s) updated", result.applied.len())
}

async fn run(client: &ApiClient, command: Command) -> Result<String> {
  let out = match command {
    Command::Status => {
      let view = client.entitlement().await?;
      let access = client.access().await?;
      let writes = if access.is_granted() { "allowed" } else { "blocked" };
      format!("{}\nwrites: {writes}", render::entitlement(&view))
    }
    Command::Trial => format!("status: {}", client.start_trial().await?.status),
    Command::Subscribe => format!("status: {}", client.subscribe().await?.status),

    Command::Tasks { date } => render::items(&client.tasks(date.unwrap_or_else(today)).await?),
    Command::Task(cmd) => match cmd {
      TaskCommand::Add { title, principle, goal, date } => {
        let date = date.unwrap_or_else(today);
        render::item_line(&client.add_task(date, &title, principle, goal).await?)
      }
      TaskCommand::Done { id } => {
        render::item_line(&client.update(Collection::Tasks, id, "toggle").await?)
      }
      TaskCommand::Promote { id } => {
        applied(client.reposition(Collection::Tasks, id, "promote").await?)
      }
      TaskCommand::Rm { id } => applied(client.remove(Collection::Tasks, id).await?),
      TaskCommand::Order { ids, date } => {
        applied(client.order_tasks(date.unwrap_or_else(today), &ids).await?)
      }
    },

    Command::Goals { active } => render::items(&client.goals(active).await?),
    Command::Goal(cmd) => match cmd {
      GoalCommand::Add { title, principle, description } => render::item_line(
        &client.add_goal(&title, principle, description.as_deref()).await?,
      ),
      GoalCommand::Activate { id } => {
        render::item_line(&client.update(Collection::Goals, id, "activate").await?)
      }
      GoalCommand::Deactivate { id } => {
        applied(client.reposition(Collection::Goals, id, "deactivate").await?)
      }
      GoalCommand::Achieve { id } => {
        applied(client.reposition(Collection::Goals, id, "achieve").await?)
      }
      GoalCommand::Rm { id } => applied(client.remove(Collection::Goals, id).await?),
      GoalCommand::Order { ids } => applied(client.order(Collection::Goals, &ids).await?),
    },

    Command::Principles => render::items(&client.principles().await?),
    Command::Principle(cmd) => match cmd {
      PrincipleCommand::Add { title, description } => {
        render::item_line(&client.add_principle(&title, description.as_deref()).await?)
      }
      PrincipleCommand::Promote { id } => {
        applied(client.reposition(Collection::Principles, id, "promote").await?)
      }
      PrincipleCommand::Rm { id } => applied(client.remove(Collection::Principles, id).await?),
      PrincipleCommand::Order { ids } => {
        applied(client.order(Collection::Principles, &ids).await?)
      }
    },

    Command::Habits { date } => {
      render::habit_day(&client.habit_day(date.unwrap_or_else(today)).await?)
    }
    Command::Habit(cmd) => match cmd {
      HabitCommand::Add { title } => {
        let habit = client.add_custom_habit(&title).await?;
        format!("created {} ({})", habit.title, habit.habit_id)
      }
      HabitCommand::Rename { id, title } => {
        client.rename_custom_habit(id, &title).await?;
        format!("renamed {id}")
      }
      HabitCommand::Rm { id } => {
        client.delete_custom_habit(id).await?;
        format!("deleted {id}")
      }
      HabitCommand::Select { habits } => {
        let selected = client.select_habits(&habits).await?;
        format!("{} habit(s) selected", selected.len())
      }
      HabitCommand::Toggle { habit, date } => {
        let c = client.toggle_habit(habit.to_ref(), date).await?;
        let state = if c.is_completed { "done" } else { "not done" };
        format!("{}: {state}", c.date)
      }
      HabitCommand::Rate { habit } => {
        let rate = client.habit_rate(habit.to_ref()).await?;
        format!(
          "{}/{} days ({})",
          rate.completed_days,
          rate.total_days,
          render::percent(rate.rate)
        )
      }
      HabitCommand::Week { start } => render::habit_week(&client.habit_week(start).await?),
    },

    Command::Progress { start, end } => {
      let range = start.zip(end);
      render::progress(&client.progress(range).await?)
    }
  };
  Ok(out)
}
