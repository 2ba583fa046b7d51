use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use prompt_workshop::app::{App, Composition};
use prompt_workshop::export::{relative_time, ContentStats};
use prompt_workshop::history::HistoryFilter;
use prompt_workshop::models::{FieldKind, ScenarioSpec};
use prompt_workshop::Error;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "prompt-workshop")]
#[command(about = "Build teaching prompts from scenario templates")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List scenarios, optionally narrowed by category or search text.
    Scenarios {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a scenario's fields.
    Show { scenario: String },
    /// Fill a scenario's form and print the rendered prompt.
    Render {
        scenario: String,
        /// Field assignment; repeat for each field or multi-select pick.
        #[arg(
            short = 's',
            long = "set",
            value_name = "FIELD=VALUE",
            value_parser = parse_assignment_arg
        )]
        assignments: Vec<(String, String)>,
        /// Save the result to history.
        #[arg(long)]
        save: bool,
        /// Write the result to a text file in the export directory.
        #[arg(long)]
        export: bool,
    },
    /// Check the built-in catalog for inconsistencies.
    Validate,
    /// Manage saved prompts.
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    List {
        #[arg(long)]
        favorites: bool,
        #[arg(long)]
        search: Option<String>,
    },
    /// Print a saved prompt exactly as it was saved.
    Show { id: String },
    /// Re-render a saved entry's form values against the current catalog.
    Restore { id: String },
    Favorite { id: String },
    Remove { id: String },
    Clear,
    Export,
}

fn parse_assignment_arg(input: &str) -> std::result::Result<(String, String), String> {
    match input.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::InvalidAssignment(input.to_string()).to_string()),
    }
}

fn print_scenario_line(scenario: &ScenarioSpec) {
    println!(
        "{} {:<24} {} [{}]",
        scenario.icon, scenario.id, scenario.name, scenario.category
    );
}

fn print_content(content: &str, scenario_name: &str) {
    let stats = ContentStats::of(content);
    println!("{}", content);
    println!(
        "\n-- {}: {} lines, {} characters, {} words",
        scenario_name, stats.lines, stats.characters, stats.words
    );
}

fn print_composition(composition: &Composition) {
    print_content(&composition.content, &composition.scenario.name);
}

fn run(command: Command) -> Result<()> {
    let mut app = App::new()?;

    match command {
        Command::Scenarios { category, search } => {
            let catalog = app.catalog();
            let mut scenarios: Vec<&ScenarioSpec> = match search {
                Some(query) => catalog.search(&query),
                None => catalog.list_all().iter().collect(),
            };
            if let Some(category) = category {
                scenarios.retain(|s| s.category == category);
            }
            for scenario in scenarios {
                print_scenario_line(scenario);
            }
        }
        Command::Show { scenario } => {
            let scenario = app.scenario(&scenario)?;
            print_scenario_line(scenario);
            println!("{}\n", scenario.description);
            for field in &scenario.fields {
                let kind = match field.kind {
                    FieldKind::SingleLineText => "text",
                    FieldKind::MultiLineText => "textarea",
                    FieldKind::SingleSelect => "select",
                    FieldKind::MultiSelect => "multiselect",
                };
                let marker = if field.required { "*" } else { " " };
                println!("{} {:<28} {:<12} {}", marker, field.id, kind, field.label);
                if let Some(options) = &field.options {
                    println!("    options: {}", options.join(" | "));
                }
                if let Some(hint) = field.placeholder.as_ref().or(field.help.as_ref()) {
                    println!("    hint: {}", hint);
                }
            }
        }
        Command::Render {
            scenario,
            assignments,
            save,
            export,
        } => {
            let composition = app.compose(&scenario, &assignments)?;
            print_composition(&composition);
            if save {
                let entry = app.save(&composition);
                println!("Saved as {}", entry.id);
            }
            if export {
                let path = app.export_prompt(&composition)?;
                println!("Exported to {}", path.display());
            }
        }
        Command::Validate => {
            let issues = app.catalog().validate();
            if issues.is_empty() {
                info!("Catalog is consistent");
                println!("{} scenarios, no issues", app.catalog().list_all().len());
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
                anyhow::bail!("{} catalog issues found", issues.len());
            }
        }
        Command::History { command } => run_history(&mut app, command)?,
    }

    Ok(())
}

fn run_history(app: &mut App, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List { favorites, search } => {
            let now = Utc::now().with_timezone(&Local);
            let filter = HistoryFilter {
                query: search,
                favorites_only: favorites,
            };
            for entry in app.history().filter(&filter) {
                let star = if entry.favorite { "★" } else { " " };
                let first_line = entry.content.lines().next().unwrap_or_default();
                println!(
                    "{} {} {:<10} {} | {}",
                    star,
                    entry.id,
                    relative_time(&entry.created_at.with_timezone(&Local), &now),
                    entry.scenario_name,
                    first_line
                );
            }
        }
        HistoryCommand::Show { id } => {
            let entry = app.saved_entry(&id)?;
            print_content(&entry.content, &entry.scenario_name);
        }
        HistoryCommand::Restore { id } => {
            let composition = app.restore(&id)?;
            print_composition(&composition);
        }
        HistoryCommand::Favorite { id } => match app.history_mut().toggle_favorite(&id) {
            Some(true) => println!("Marked {} as favorite", id),
            Some(false) => println!("Unmarked {} as favorite", id),
            None => anyhow::bail!(Error::HistoryNotFound(id)),
        },
        HistoryCommand::Remove { id } => {
            if !app.history_mut().remove(&id) {
                anyhow::bail!(Error::HistoryNotFound(id));
            }
            println!("Removed {}", id);
        }
        HistoryCommand::Clear => {
            app.history_mut().clear();
            println!("History cleared");
        }
        HistoryCommand::Export => {
            let path = app.export_history()?;
            println!("Exported to {}", path.display());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prompt_workshop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    match run(args.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_assignment_arg;

    #[test]
    fn test_parse_assignment_arg_valid() {
        let (field, value) = parse_assignment_arg("topic=仓储=流程").unwrap();
        assert_eq!(field, "topic");
        assert_eq!(value, "仓储=流程");
    }

    #[test]
    fn test_parse_assignment_arg_allows_empty_value() {
        assert_eq!(
            parse_assignment_arg("notes=").unwrap(),
            ("notes".to_string(), String::new())
        );
    }

    #[test]
    fn test_parse_assignment_arg_invalid() {
        assert_eq!(
            parse_assignment_arg("topic").unwrap_err(),
            "Invalid assignment 'topic'. Expected format: field=value"
        );
        assert!(parse_assignment_arg("=value").is_err());
    }
}
