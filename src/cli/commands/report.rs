//! Leaderboard and stats commands over the local data directory.

use console::style;

use crate::cli::icons;
use crate::config::Settings;
use crate::models::{parse_guesses, parse_results, Collection};
use crate::services::{leaderboard, CompetitionStats};
use crate::store::JsonStore;

pub async fn cmd_leaderboard(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = JsonStore::new(&settings.data_dir);
    let guesses = parse_guesses(&store.load(Collection::Guesses).await);
    let results = parse_results(&store.load(Collection::Results).await);
    let standings = leaderboard(&guesses, &results, settings.winner_threshold);

    if json {
        println!("{}", serde_json::to_string_pretty(&standings)?);
        return Ok(());
    }

    if standings.is_empty() {
        println!("{} No results recorded yet", icons::info());
        return Ok(());
    }

    for standing in &standings {
        println!(
            "\n{} {} ({}): actual {}",
            icons::info(),
            style(&standing.course_name).bold(),
            standing.exam_type,
            standing.actual_average
        );
        if standing.participants.is_empty() {
            println!("  no guesses");
        }
        for p in &standing.participants {
            let marker = if p.is_winner {
                icons::success().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "  {} {:>3}. {:<20} guess {:>6.2}  diff {:>6.2}",
                marker, p.rank, p.username, p.guess, p.difference
            );
        }
    }
    Ok(())
}

pub async fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = JsonStore::new(&settings.data_dir);
    let stats = CompetitionStats::load(&store).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{} Competition stats ({})", icons::info(), settings.data_dir.display());
    println!("  Users:               {}", stats.total_users);
    println!("  Predictions:         {}", stats.total_predictions);
    println!("  Results recorded:    {}", stats.results_set);
    println!(
        "  Courses predicted:   {}/{}",
        stats.unique_courses_predicted, stats.total_courses_available
    );
    Ok(())
}
