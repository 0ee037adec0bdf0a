use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::ado::{AdoClient, WorkItemGateway};
use crate::config::{self, AppConfig};
use crate::llm::client::SparkClient;
use crate::llm::Assistant;
use crate::model::chat::parse_transcript;
use crate::model::generated::GeneratedItem;
use crate::model::work_item::{WorkItemRecord, WorkItemType};
use crate::sync::{self, BatchOptions, BatchReport, BatchState, RowOutcome};
use crate::util::html::to_plain_text;

/// One-shot commands. Write commands default to a dry run.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Show(u64),
    Query(String),
    Tasks { story: u64, create: bool, force: bool },
    Stories { feature: u64, create: bool },
    Review(u64),
    Details { feature: u64, apply: bool },
    Extract { feature: u64, transcript: PathBuf, create: bool },
    Iterations(String),
    Replicate { story: u64, sprints: Vec<String>, create: bool },
    Help,
}

impl CliCommand {
    fn needs_model(&self) -> bool {
        matches!(
            self,
            CliCommand::Tasks { .. }
                | CliCommand::Stories { .. }
                | CliCommand::Review(_)
                | CliCommand::Details { .. }
                | CliCommand::Extract { .. }
        )
    }
}

/// Parse the process arguments (without the program name). `None` means no
/// subcommand was given and the dashboard should start.
pub fn parse_args(args: &[String]) -> Result<Option<CliCommand>> {
    let Some((verb, rest)) = args.split_first() else {
        return Ok(None);
    };

    let mut positional: Vec<&str> = Vec::new();
    let mut flags: Vec<&str> = Vec::new();
    for arg in rest {
        if arg.starts_with("--") {
            flags.push(arg.as_str());
        } else {
            positional.push(arg.as_str());
        }
    }

    let command = match verb.as_str() {
        "show" => {
            allow_flags(verb, &flags, &[])?;
            CliCommand::Show(id_arg(&positional, 0, "work item id")?)
        }
        "query" => {
            allow_flags(verb, &flags, &[])?;
            CliCommand::Query(text_arg(&positional, 0, "query id")?)
        }
        "tasks" => {
            allow_flags(verb, &flags, &["--create", "--force"])?;
            CliCommand::Tasks {
                story: id_arg(&positional, 0, "story id")?,
                create: flags.contains(&"--create"),
                force: flags.contains(&"--force"),
            }
        }
        "stories" => {
            allow_flags(verb, &flags, &["--create"])?;
            CliCommand::Stories {
                feature: id_arg(&positional, 0, "feature id")?,
                create: flags.contains(&"--create"),
            }
        }
        "review" => {
            allow_flags(verb, &flags, &[])?;
            CliCommand::Review(id_arg(&positional, 0, "feature id")?)
        }
        "details" => {
            allow_flags(verb, &flags, &["--apply"])?;
            CliCommand::Details {
                feature: id_arg(&positional, 0, "feature id")?,
                apply: flags.contains(&"--apply"),
            }
        }
        "extract" => {
            allow_flags(verb, &flags, &["--create"])?;
            CliCommand::Extract {
                feature: id_arg(&positional, 0, "feature id")?,
                transcript: PathBuf::from(text_arg(&positional, 1, "transcript file")?),
                create: flags.contains(&"--create"),
            }
        }
        "iterations" => {
            allow_flags(verb, &flags, &[])?;
            CliCommand::Iterations(text_arg(&positional, 0, "iteration path")?)
        }
        "replicate" => {
            allow_flags(verb, &flags, &["--create"])?;
            let story = id_arg(&positional, 0, "story id")?;
            let sprints: Vec<String> = positional[1..].iter().map(|s| s.to_string()).collect();
            if sprints.is_empty() {
                bail!("Usage: ado-assist replicate <story-id> <sprint-path>... [--create]");
            }
            CliCommand::Replicate {
                story,
                sprints,
                create: flags.contains(&"--create"),
            }
        }
        "help" | "-h" | "--help" => CliCommand::Help,
        other => bail!("Unknown command '{other}'. Run `ado-assist help` for usage."),
    };
    Ok(Some(command))
}

fn allow_flags(verb: &str, flags: &[&str], allowed: &[&str]) -> Result<()> {
    match flags.iter().find(|f| !allowed.contains(f)) {
        Some(flag) => bail!("Unknown flag {flag} for '{verb}'"),
        None => Ok(()),
    }
}

fn text_arg(positional: &[&str], index: usize, what: &str) -> Result<String> {
    match positional.get(index) {
        Some(value) => Ok(value.to_string()),
        None => bail!("Missing {what}"),
    }
}

fn id_arg(positional: &[&str], index: usize, what: &str) -> Result<u64> {
    let raw = text_arg(positional, index, what)?;
    raw.trim_start_matches('#')
        .parse()
        .with_context(|| format!("{what} must be a number, got '{raw}'"))
}

/// Build the real gateways and run one command, printing to stdout.
pub async fn run(command: CliCommand, config: &AppConfig) -> Result<()> {
    let gateway = AdoClient::from_env(&config.ado)?;
    let assistant = if command.needs_model() {
        let mut assistant = Assistant::new(Box::new(SparkClient::from_env(&config.llm)?));
        if config.debug_dump {
            assistant = assistant.with_dump(config::data_dir().join("last_response.json"));
        }
        Some(assistant)
    } else {
        None
    };

    let mut stdout = std::io::stdout();
    execute(
        command,
        &gateway,
        assistant.as_ref(),
        config.batch.delay(),
        &mut stdout,
    )
    .await
}

/// Run one command against the given gateways. Batch failures are printed
/// row by row and then returned as an error so the exit code reflects them.
pub async fn execute(
    command: CliCommand,
    gateway: &dyn WorkItemGateway,
    assistant: Option<&Assistant>,
    delay: std::time::Duration,
    out: &mut dyn Write,
) -> Result<()> {
    let options = |write: bool| BatchOptions {
        dry_run: !write,
        delay,
    };
    let model = || assistant.context("this command needs the model gateway");

    match command {
        CliCommand::Help => print_help(),
        CliCommand::Show(id) => {
            let record = gateway.fetch_one(id).await?;
            print_record(out, &record)?;
        }
        CliCommand::Query(query_id) => {
            let ids = gateway.run_saved_query(&query_id).await?;
            let records = gateway.fetch_batch(&ids).await?;
            writeln!(out, "{} item(s)", records.len())?;
            for record in &records {
                print_summary_line(out, record)?;
            }
        }
        CliCommand::Tasks {
            story,
            create,
            force,
        } => {
            let story = gateway.fetch_one(story).await?;
            let proposal = model()?.generate_tasks(&story).await?;
            writeln!(out, "Tasks for #{} {}:", story.id, story.title)?;
            print_rows(out, &proposal.tasks)?;
            for violation in &proposal.violations {
                writeln!(out, "  ! {violation}")?;
            }
            match sync::upload_tasks(gateway, &story, &proposal.tasks, force, options(create))
                .await
            {
                Ok(report) => print_report(out, &report)?,
                Err(refused) if !create => writeln!(out, "Would be refused: {refused}")?,
                Err(refused) => return Err(refused).context("use --force to upload anyway"),
            }
        }
        CliCommand::Stories { feature, create } => {
            let feature = gateway.fetch_one(feature).await?;
            let existing = gateway
                .fetch_children(&feature, Some(&WorkItemType::UserStory))
                .await?;
            let stories = model()?.suggest_stories(&feature, &existing).await?;
            writeln!(out, "Suggested stories for #{} {}:", feature.id, feature.title)?;
            print_rows(out, &stories)?;
            let report = sync::create_children(
                gateway,
                &feature,
                &stories,
                &WorkItemType::UserStory,
                options(create),
            )
            .await;
            print_report(out, &report)?;
        }
        CliCommand::Review(feature) => {
            let feature = gateway.fetch_one(feature).await?;
            let stories = gateway
                .fetch_children(&feature, Some(&WorkItemType::UserStory))
                .await?;
            let review = model()?.review_plan(&feature, &stories).await?;
            print_section(out, "Suggestions", &review.suggestions)?;
            print_section(out, "External dependencies", &review.external_dependencies)?;
            print_section(out, "Missing steps", &review.missing_steps)?;
            if !review.iteration_analysis.is_empty() {
                writeln!(out, "Iteration analysis:\n  {}", review.iteration_analysis)?;
            }
        }
        CliCommand::Details { feature, apply } => {
            let feature = gateway.fetch_one(feature).await?;
            let stories = gateway
                .fetch_children(&feature, Some(&WorkItemType::UserStory))
                .await?;
            let details = model()?.generate_feature_details(&feature, &stories).await?;
            for (label, html) in [
                ("Description", &details.description),
                ("External dependencies", &details.external_dependencies),
                ("Non-functional requirements", &details.non_functional_requirements),
                ("Acceptance criteria", &details.acceptance_criteria),
            ] {
                writeln!(out, "{label}:\n{}\n", to_plain_text(html))?;
            }
            let report =
                sync::apply_feature_details(gateway, &feature, &details, options(apply)).await;
            print_report(out, &report)?;
        }
        CliCommand::Extract {
            feature,
            transcript,
            create,
        } => {
            let text = std::fs::read_to_string(&transcript)
                .with_context(|| format!("Failed to read {}", transcript.display()))?;
            let turns = parse_transcript(&text);
            if turns.is_empty() {
                bail!("{} holds no conversation turns", transcript.display());
            }
            let feature = gateway.fetch_one(feature).await?;
            let stories = model()?.extract_stories_from_chat(&turns).await?;
            writeln!(out, "Stories from {} turn(s):", turns.len())?;
            print_rows(out, &stories)?;
            let report = sync::create_children(
                gateway,
                &feature,
                &stories,
                &WorkItemType::UserStory,
                options(create),
            )
            .await;
            print_report(out, &report)?;
        }
        CliCommand::Iterations(path) => {
            let nodes = gateway.list_iteration_children(&path).await?;
            if nodes.is_empty() {
                writeln!(out, "No iterations under {path}")?;
            }
            for node in &nodes {
                writeln!(out, "{:<12} {}", node.name, node.path)?;
            }
        }
        CliCommand::Replicate {
            story,
            sprints,
            create,
        } => {
            let story = gateway.fetch_one(story).await?;
            let parent_id = story
                .parent_id()
                .with_context(|| format!("#{} has no parent to create copies under", story.id))?;
            let parent = gateway.fetch_one(parent_id).await?;
            let template = GeneratedItem::from_record(&story);
            let report = sync::replicate_into_sprints(
                gateway,
                &parent,
                &template,
                &story.work_item_type,
                &sprints,
                options(create),
            )
            .await;
            print_report(out, &report)?;
        }
    }
    Ok(())
}

fn print_summary_line(out: &mut dyn Write, record: &WorkItemRecord) -> Result<()> {
    writeln!(
        out,
        "#{:<8} {:<11} {:<10} {}",
        record.id,
        record.work_item_type.as_str(),
        record.state,
        record.title
    )?;
    Ok(())
}

fn print_record(out: &mut dyn Write, record: &WorkItemRecord) -> Result<()> {
    print_summary_line(out, record)?;
    writeln!(out, "  Assigned to: {}", record.assigned_to)?;
    writeln!(out, "  Iteration:   {}", record.iteration_path)?;
    writeln!(out, "  Area:        {}", record.area_path)?;
    if record.story_points > 0.0 {
        writeln!(out, "  Points:      {}", record.story_points)?;
    }
    if record.original_estimate > 0.0 {
        writeln!(out, "  Estimate:    {}h", record.original_estimate)?;
    }
    if !record.tags.is_empty() {
        writeln!(out, "  Tags:        {}", record.tags.join(", "))?;
    }
    let children = record.child_ids();
    if !children.is_empty() {
        let ids: Vec<String> = children.iter().map(|id| format!("#{id}")).collect();
        writeln!(out, "  Children:    {}", ids.join(" "))?;
    }
    if !record.description.is_empty() {
        writeln!(out, "\n{}", to_plain_text(&record.description))?;
    }
    if !record.web_url.is_empty() {
        writeln!(out, "\n{}", record.web_url)?;
    }
    Ok(())
}

fn print_rows(out: &mut dyn Write, rows: &[GeneratedItem]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        match (row.original_estimate, row.story_points) {
            (Some(hours), _) => writeln!(out, "  {:>2}. {} ({hours}h)", i + 1, row.title)?,
            (None, Some(points)) => writeln!(out, "  {:>2}. {} ({points} pts)", i + 1, row.title)?,
            (None, None) => writeln!(out, "  {:>2}. {}", i + 1, row.title)?,
        }
    }
    Ok(())
}

fn print_section(out: &mut dyn Write, title: &str, lines: &[String]) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(out, "{title}:")?;
    for line in lines {
        writeln!(out, "  - {line}")?;
    }
    Ok(())
}

fn print_report(out: &mut dyn Write, report: &BatchReport) -> Result<()> {
    for row in &report.rows {
        match &row.outcome {
            RowOutcome::Written(id) => writeln!(out, "  created/updated #{id}: {}", row.label)?,
            RowOutcome::Failed(msg) => writeln!(out, "  failed: {}: {msg}", row.label)?,
            RowOutcome::NotAttempted => writeln!(out, "  skipped: {}", row.label)?,
            RowOutcome::DryRun => {}
        }
    }
    writeln!(out, "{}", report.summary())?;
    info!(rows = report.rows.len(), "cli batch done");
    if report.state() == (BatchState::Completed { with_errors: true }) {
        bail!("batch finished with errors");
    }
    Ok(())
}

pub fn print_help() {
    println!("ado-assist — work item planning assistant for Azure DevOps\n");
    println!("USAGE:");
    println!("  ado-assist                              Launch the dashboard");
    println!("  ado-assist show <id>                    Print one work item");
    println!("  ado-assist query <query-id>             Run a saved query");
    println!("  ado-assist tasks <story-id>             Generate tasks for a story");
    println!("  ado-assist stories <feature-id>         Suggest stories for a feature");
    println!("  ado-assist review <feature-id>          Review a feature's story plan");
    println!("  ado-assist details <feature-id>         Draft feature details");
    println!("  ado-assist extract <feature-id> <file>  Extract stories from a transcript");
    println!("  ado-assist iterations <path>            List sprints under an iteration path");
    println!("  ado-assist replicate <story-id> <sprint-path>...");
    println!("                                          Copy a story into each sprint");
    println!();
    println!("WRITE OPTIONS (dry run without them):");
    println!("  --create  Create the generated items (tasks, stories, extract, replicate)");
    println!("  --apply   Write the drafted details to the feature (details)");
    println!("  --force   Upload tasks even when they break the hour rules (tasks)");
    println!();
    println!("ENVIRONMENT:");
    println!("  {}, {} (required)", config::PAT_VAR, config::API_KEY_VAR);
    println!("  Settings are read from ~/.ado-assist/config.toml and .env");
}
