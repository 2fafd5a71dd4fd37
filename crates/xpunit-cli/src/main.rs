//! XPUnit CLI
//!
//! Shell driver for the associative memory core. Every invocation loads the
//! environment snapshot, runs one command, and writes the snapshot back when
//! the command changed anything.

mod state;

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use xpunit_core::{AdvancedXpEnvironment, AdvancedXpUnit, AffectState, DetourFrame};

/// XPUnit - Associative Memory CLI
#[derive(Parser)]
#[command(name = "xpunit")]
#[command(author = "XPUnit Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the XPUnit associative memory core")]
#[command(long_about = "XPUnit stores experiences as holographic role-filler capsules with affect.\n\nOff-topic emotional intrusions open a bounded flashbulb detour; rehearsal drives consolidation.")]
struct Cli {
    /// State file holding the environment snapshot
    #[arg(long, global = true, env = "XPUNIT_STATE")]
    state: Option<PathBuf>,

    /// Policies JSON file (overrides the stored policies)
    #[arg(long, global = true)]
    policies: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest an experience into a thread and topic
    Ingest {
        /// Experience text
        content: String,
        /// Narrative thread id
        #[arg(long, default_value = "default")]
        thread: String,
        /// Topic id
        #[arg(long, default_value = "general")]
        topic: String,
        /// Valence in [-1, 1] (appraised from the text when omitted)
        #[arg(long, allow_negative_numbers = true, requires = "arousal")]
        valence: Option<f64>,
        /// Arousal in [0, 1]
        #[arg(long, requires = "valence")]
        arousal: Option<f64>,
    },

    /// Recall an experience (rehearses and reconsolidates it)
    Recall {
        /// Content id
        id: String,
    },

    /// Rank experiences against a text cue without rehearsing them
    Search {
        /// Text cue
        cue: String,
        /// Maximum results
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Merge near-duplicate experiences
    Consolidate {
        /// Similarity threshold (defaults to the policy value)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Clamp runaway affect and salience back into bounds
    Safeguard,

    /// Show environment statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single experience in full
    Show {
        /// Content id
        id: String,
    },

    /// Print the effective policies as JSON
    Policies,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for --json output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let state_path = match cli.state {
        Some(path) => path,
        None => state::default_state_path()?,
    };
    let mut env = state::load_environment(&state_path, cli.policies.as_deref())?;

    let changed = match cli.command {
        Commands::Ingest {
            content,
            thread,
            topic,
            valence,
            arousal,
        } => run_ingest(&mut env, content, thread, topic, valence.zip(arousal))?,
        Commands::Recall { id } => run_recall(&mut env, &id)?,
        Commands::Search { cue, limit } => run_search(&env, &cue, limit),
        Commands::Consolidate { threshold } => run_consolidate(&mut env, threshold),
        Commands::Safeguard => run_safeguard(&mut env),
        Commands::Stats { json } => run_stats(&env, json)?,
        Commands::Show { id } => run_show(&env, &id)?,
        Commands::Policies => {
            println!("{}", serde_json::to_string_pretty(env.policies())?);
            false
        }
    };

    if changed {
        state::save_environment(&env, &state_path)?;
    }
    Ok(())
}

/// Run ingest command
fn run_ingest(
    env: &mut AdvancedXpEnvironment,
    content: String,
    thread: String,
    topic: String,
    affect: Option<(f64, f64)>,
) -> anyhow::Result<bool> {
    if content.trim().is_empty() {
        tracing::warn!(thread = %thread, topic = %topic, "Ingesting empty content");
    }

    let intrusions_before = env.total_intrusions();
    let content_id = match affect {
        Some((valence, arousal)) => env.ingest_experience_with_affect(
            &content,
            &thread,
            &topic,
            AffectState::new(valence, arousal),
        ),
        None => env.ingest_experience(&content, &thread, &topic),
    }
    .content_id
    .clone();

    println!("{}", "=== XPUnit Ingest ===".cyan().bold());
    println!();
    println!("{}: {}", "Content ID".white().bold(), content_id);
    println!("{}: {} / {}", "Thread / Topic".white().bold(), thread, topic);
    if let Some(unit) = env.unit(&content_id) {
        print_affect(&unit.affect);
        println!("{}: {:.3}", "Salience".white().bold(), unit.salience);
        println!("{}: {:.3}", "Consciousness".white().bold(), unit.consciousness_score);
    }

    if env.total_intrusions() > intrusions_before {
        println!();
        println!("{}", "Intrusion detected".yellow().bold());
        match detour_opened_by(env, &content_id) {
            Some(frame) => {
                println!("  {} {}", "flashbulb".yellow(), frame.flashbulb_id);
                println!("  {} {}", "returns to".yellow(), frame.return_to);
            }
            None => println!("  {}", "detour stack full, no flashbulb opened".dimmed()),
        }
    }

    println!();
    println!(
        "{}",
        format!("Stored ({})", truncate(&content, 60)).green().bold()
    );
    Ok(true)
}

/// The detour frame pushed for `content_id`, if its ingestion opened one.
///
/// A saturated stack still holds older frames, so the top frame only counts
/// when it was opened by this unit.
fn detour_opened_by<'a>(env: &'a AdvancedXpEnvironment, content_id: &str) -> Option<&'a DetourFrame> {
    env.detour_stack()
        .last()
        .filter(|frame| frame.intruding_id == content_id)
}

/// Run recall command
fn run_recall(env: &mut AdvancedXpEnvironment, id: &str) -> anyhow::Result<bool> {
    let Some(unit) = env.recall_experience(id) else {
        anyhow::bail!("No experience with id '{}'", id);
    };

    println!("{}", "=== XPUnit Recall ===".cyan().bold());
    println!();
    println!("{}", unit.content);
    println!();
    println!("{}: {}", "Stage".white().bold(), unit.consolidation);
    println!("{}: {}", "Rehearsals".white().bold(), unit.rehearsals);
    println!("{}: {:.3}", "Salience".white().bold(), unit.salience);
    Ok(true)
}

/// Run search command
fn run_search(env: &AdvancedXpEnvironment, cue: &str, limit: usize) -> bool {
    let hits = env.search_experiences(cue, limit, Utc::now());

    println!("{}", "=== XPUnit Search ===".cyan().bold());
    println!();
    if hits.is_empty() {
        println!("{}", "No matching experiences.".dimmed());
        return false;
    }

    for (rank, hit) in hits.iter().enumerate() {
        let content = env.unit(&hit.content_id).map(|u| u.content.as_str()).unwrap_or("");
        println!(
            "{:>2}. {} {}",
            rank + 1,
            format!("[{:.3}]", hit.score).green(),
            truncate(content, 60)
        );
        println!(
            "    {} sim {:.3} retention {:.3}",
            hit.content_id.dimmed(),
            hit.similarity,
            hit.retention
        );
    }
    false
}

/// Run consolidation
fn run_consolidate(env: &mut AdvancedXpEnvironment, threshold: Option<f64>) -> bool {
    let threshold = threshold.unwrap_or(env.policies().consolidation_threshold);

    println!("{}", "=== XPUnit Consolidation ===".cyan().bold());
    println!();

    let report = env.consolidate_memories(threshold);

    println!("{}: {:.3}", "Threshold".white().bold(), report.threshold);
    println!("{}: {}", "Passes".white().bold(), report.passes);
    println!("{}: {}", "Units Examined".white().bold(), report.units_examined);
    println!("{}: {}", "Units Merged".white().bold(), report.units_merged);
    println!("{}: {}", "Units Pinned".white().bold(), report.units_pinned);

    for merge in &report.merges {
        println!(
            "  {} {} {}",
            merge.survivor_id,
            "<-".dimmed(),
            merge.absorbed_ids.join(", ")
        );
    }

    println!();
    println!(
        "{}",
        format!(
            "Consolidation complete: {} units merged, {} remain",
            report.units_merged,
            env.len()
        )
        .green()
    );
    report.units_merged > 0
}

/// Run safeguard pass
fn run_safeguard(env: &mut AdvancedXpEnvironment) -> bool {
    let report = env.apply_runaway_affect_safeguards();

    println!("{}", "=== XPUnit Safeguards ===".cyan().bold());
    println!();
    println!("{}: {}", "Units Checked".white().bold(), report.units_checked);
    println!("{}: {}", "Affect Clamped".white().bold(), report.affect_clamped);
    println!("{}: {}", "Salience Clamped".white().bold(), report.salience_clamped);
    println!("{}: {}", "Non-finite Repaired".white().bold(), report.non_finite_repaired);
    println!("{}: {}", "Mood Clamped".white().bold(), report.mood_clamped);
    println!("{}: {}", "Detours Trimmed".white().bold(), report.detours_trimmed);

    println!();
    if report.changed() {
        println!("{}", "State corrected.".yellow());
    } else {
        println!("{}", "All values within bounds.".green());
    }
    report.changed()
}

/// Run stats command
fn run_stats(env: &AdvancedXpEnvironment, json: bool) -> anyhow::Result<bool> {
    let stats = env.get_comprehensive_statistics();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(false);
    }

    println!("{}", "=== XPUnit Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Units".white().bold(), stats.total_units);
    println!("{}: {}", "Flashbulb Units".white().bold(), stats.flashbulb_units);
    println!("{}: {}", "Total Ingestions".white().bold(), stats.total_ingestions);
    println!("{}: {}", "Total Intrusions".white().bold(), stats.total_intrusions);
    println!("{}: {}", "Total Consolidations".white().bold(), stats.total_consolidations);
    println!("{}: {}", "Detour Depth".white().bold(), stats.detour_depth);
    println!("{}: {}", "Active Topics".white().bold(), stats.active_topic_buffers);
    println!("{}: {}", "Threads".white().bold(), stats.narrative_capsules);
    println!("{}: {}", "Links".white().bold(), stats.total_links);
    println!(
        "{}: {:.3} (variance {:.4})",
        "Affect Magnitude".white().bold(),
        stats.affect_magnitude_mean,
        stats.affect_magnitude_variance
    );
    println!(
        "{}: {:.3} mean, {:.3} max",
        "Salience".white().bold(),
        stats.mean_salience,
        stats.max_salience
    );
    print_affect(&stats.mood_state);

    if stats.total_units > 0 {
        println!();
        println!("{}", "=== Consolidation Stages ===".yellow().bold());
        for (stage, count) in &stats.stage_distribution {
            print_distribution_bar(stage, *count, stats.total_units, "yellow");
        }

        println!();
        println!("{}", "=== Consciousness Levels ===".magenta().bold());
        for (level, count) in &stats.consciousness_distribution {
            print_distribution_bar(level, *count, stats.total_units, "magenta");
        }
    }
    Ok(false)
}

/// Run show command
fn run_show(env: &AdvancedXpEnvironment, id: &str) -> anyhow::Result<bool> {
    let Some(unit) = env.unit(id) else {
        anyhow::bail!("No experience with id '{}'", id);
    };
    print_unit(unit, env);
    Ok(false)
}

fn print_unit(unit: &AdvancedXpUnit, env: &AdvancedXpEnvironment) {
    println!("{}", format!("=== {} ===", unit.content_id).cyan().bold());
    println!();
    println!("{}", unit.content);
    println!();
    print_affect(&unit.affect);
    println!("{}: {:.3}", "Salience".white().bold(), unit.salience);
    println!("{}: {:.3}", "Importance".white().bold(), unit.importance);
    println!("{}: {:.3}", "Reliability".white().bold(), unit.reliability);
    println!(
        "{}: {} ({} rehearsals)",
        "Stage".white().bold(),
        unit.consolidation,
        unit.rehearsals
    );
    println!(
        "{}: {:.1}%",
        "Retention".white().bold(),
        unit.retention_at(Utc::now(), env.policies()) * 100.0
    );
    println!(
        "{}: {:.3}",
        "Consciousness".white().bold(),
        unit.consciousness_score
    );
    println!(
        "{}: {}",
        "Created".white().bold(),
        unit.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(last) = unit.last_recall {
        println!("{}: {}", "Last Recall".white().bold(), last.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(tag) = &unit.mood_tag {
        println!("{}: {}", "Mood Tag".white().bold(), tag);
    }

    let roles: Vec<&str> = unit.memory_capsule.bindings().keys().map(String::as_str).collect();
    println!("{}: {}", "Capsule Roles".white().bold(), roles.join(", "));

    if unit.text_trace.len() > 1 {
        println!();
        println!("{}", "Evidence:".white().bold());
        for text in &unit.text_trace {
            println!("  {} {}", "-".dimmed(), truncate(text, 70));
        }
    }

    if !unit.links.is_empty() {
        println!();
        println!("{}", "Links:".white().bold());
        for link in &unit.links {
            let ttl = link
                .ttl
                .map(|t| format!(" ttl {}", t))
                .unwrap_or_default();
            println!(
                "  {} {} ({:.2}{})",
                link.link_type.to_string().yellow(),
                link.target_id,
                link.weight,
                ttl.dimmed()
            );
        }
    }

    if !unit.merged_from.is_empty() {
        println!();
        println!("{}: {}", "Merged From".white().bold(), unit.merged_from.join(", "));
    }
}

fn print_affect(affect: &AffectState) {
    let valence = format!("{:+.2}", affect.valence);
    let colored_valence = if affect.valence > 0.1 {
        valence.green()
    } else if affect.valence < -0.1 {
        valence.red()
    } else {
        valence.white()
    };
    println!(
        "{}: valence {} arousal {:.2}",
        "Affect".white().bold(),
        colored_valence,
        affect.arousal
    );
}

/// Print a distribution bar
fn print_distribution_bar(label: &str, count: usize, total: usize, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "yellow" => bar.yellow(),
        "magenta" => bar.magenta(),
        _ => bar.white(),
    };

    println!(
        "  {:15} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
