use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use inquire::Text;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::block::{AIBlock, ScheduleBlock};
use crate::models::goal::{self, Goal};
use crate::models::prefs::UserPrefs;
use crate::scheduler::availability::{SearchConfig, find_slots};
use crate::scheduler::validation::check_suggestion;
use crate::service::agenda_service::render_slots;
use crate::service::block_service::BlockService;
use crate::service::calendar::{BlockCalendar, CalendarSource};
use crate::service::openai_service::{OpenAIClient, OpenAIService};
use crate::storage::DB;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print free slots for a block of the given length.
    Suggest {
        #[arg(long, default_value_t = 60)]
        minutes: u32,
        #[arg(long)]
        results: Option<usize>,
    },
    /// Describe a block in natural language and save it.
    Plan {},
    AddGoal {
        name: String,
        #[arg(long)]
        hours_per_week: Option<u32>,
    },
    Goals {},
}

pub async fn cli(
    shared_blocks: Arc<Mutex<DB<ScheduleBlock>>>,
    shared_goals: Arc<Mutex<DB<Goal>>>,
    prefs: UserPrefs,
    default_user: String,
    default_chat: String,
    openai_api_key: String,
) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Suggest { minutes, results } => {
            let mut config = SearchConfig::new(Duration::minutes(i64::from(*minutes)), prefs.tz);
            if let Some(cap) = results {
                config.max_results = *cap;
            }
            let now = Utc::now();
            let calendar = BlockCalendar::new(shared_blocks.clone());
            let horizon_end = now + Duration::days(i64::from(config.horizon_days));
            match calendar.busy_between(now, horizon_end).await {
                Ok(busy) => {
                    let slots = find_slots(&busy, &prefs.windows, &config, now);
                    println!("{}", render_slots(&slots, &prefs));
                }
                Err(e) => println!("Failed to read calendar: {}", e),
            }
        }
        Commands::Plan {} => {
            let mut db = shared_blocks.lock().await;
            if let Err(e) = plan_block_from_prompt(
                &mut db,
                &prefs,
                &default_user,
                &default_chat,
                &openai_api_key,
            )
            .await
            {
                println!("Failed to plan block from prompt {}", e);
            }
        }
        Commands::AddGoal {
            name,
            hours_per_week,
        } => {
            let mut db = shared_goals.lock().await;
            match goal::create_goal(&mut db, &default_user, name, *hours_per_week) {
                Ok(id) => println!("Created goal {}", id),
                Err(e) => println!("Failed to create goal: {}", e),
            }
        }
        Commands::Goals {} => {
            let db = shared_goals.lock().await;
            let goals = goal::active_goals(&db, &default_user);
            if goals.is_empty() {
                println!("No active goals.");
            }
            for (idx, goal) in goals.iter().enumerate() {
                match goal.target_hours_per_week {
                    Some(hours) => println!("{}) {} ({}h/week)", idx + 1, goal.name, hours),
                    None => println!("{}) {}", idx + 1, goal.name),
                }
            }
        }
    }
}

async fn plan_block_from_prompt(
    db: &mut DB<ScheduleBlock>,
    prefs: &UserPrefs,
    default_user: &str,
    default_chat: &str,
    openai_api_key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_prompt = match specify_prompt() {
        Ok(prompt) => prompt,
        Err(_) => {
            println!("No user prompt supplied");
            return Err("No user prompt provided".into());
        }
    };

    let openai = OpenAIService::new(openai_api_key.to_string(), prefs.tz.to_string());
    let payload = openai
        .generate_prompt(&user_prompt, "calendar_action")
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { format!("{}", e).into() })?;
    println!("{}", payload);
    let ai_block: AIBlock = serde_json::from_str(&payload)?;

    let check = check_suggestion(ai_block.start, ai_block.end, Utc::now(), prefs.tz);
    if let Some(reason) = check.reason() {
        println!("Refusing to schedule: {}", reason);
        return Ok(());
    }

    match BlockService::create(
        db,
        default_user,
        default_chat,
        &ai_block.title,
        &ai_block.start,
        &ai_block.end,
        None,
    )
    .await
    {
        Ok(_) => println!(
            "Scheduled \"{}\" for {}",
            ai_block.title,
            ai_block.start.with_timezone(&prefs.tz)
        ),
        Err(e) => println!("Failed to create block: {}", e),
    }
    Ok(())
}

fn specify_prompt() -> Result<String, Box<dyn std::error::Error>> {
    Ok(Text::new("What should I put on your calendar?").prompt()?)
}
