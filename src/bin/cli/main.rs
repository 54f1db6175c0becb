//! Thin CLI over the conversion pipeline: prompts for the input directory,
//! confirms clearing a pre-existing output directory, runs the conversion,
//! and prints the categorized issue summary.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use papyrus::pipeline::setup_directories;
use papyrus::preview::preview_export;
use papyrus::{ConvertConfig, Converter, IssueTracker};

#[derive(Parser)]
#[command(name = "papyrus-cli", about = "Convert note exports to RTFD packages", version)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an export directory (default command)
    Convert {
        /// Export directory; prompted for when omitted
        input: Option<PathBuf>,
        /// Clear a pre-existing output directory without asking
        #[arg(long)]
        yes: bool,
    },

    /// Inspect an export directory without converting it
    Preview {
        /// Export directory
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Preview { input }) => run_preview(&input, &cli.format),
        Some(Command::Convert { input, yes }) => run_convert(input, yes, &cli.format),
        None => run_convert(None, false, &cli.format),
    }
}

fn run_preview(input: &Path, format: &OutputFormat) -> anyhow::Result<()> {
    let preview = preview_export(input, &ConvertConfig::default())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&preview)?),
        OutputFormat::Plain => {
            println!(
                "{}: {} notes, {} resources, {} remote images",
                preview.suggested_name,
                preview.note_count,
                preview.resource_count,
                preview.remote_image_count
            );
            for note in &preview.notes {
                let marker = if note.has_attachments { " [attachments]" } else { "" };
                println!("  {} ({}){}", note.title, note.relative_path, marker);
            }
            for warning in &preview.warnings {
                println!("  warning: {}", warning);
            }
        }
    }

    Ok(())
}

fn run_convert(
    input: Option<PathBuf>,
    yes: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let input_dir = match input {
        Some(path) => path,
        None => PathBuf::from(prompt(
            "Enter the path of the folder where the markdown files are located: ",
        )?),
    };

    let (output_dir, _) = setup_directories(&input_dir).with_context(|| {
        format!(
            "'{}' must exist and contain exported Markdown or HTML notes",
            input_dir.display()
        )
    })?;

    if output_dir.exists() && output_dir.read_dir()?.next().is_some() {
        let clear = yes
            || confirm(&format!(
                "The folder '{}' already exists. Delete its contents?",
                output_dir.display()
            ))?;
        if clear {
            clear_directory(&output_dir)?;
            println!("Deleted all files in '{}'.", output_dir.display());
        } else {
            println!("Keeping files in '{}'.", output_dir.display());
        }
    }

    let mut issues = IssueTracker::new();
    let written = Converter::new(ConvertConfig::default()).run(&input_dir, &mut issues)?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "packagesWritten": written.len(),
                    "outputDir": output_dir,
                    "issues": issues,
                }))?
            );
        }
        OutputFormat::Plain => {
            println!(
                "Wrote {} packages to '{}'.",
                written.len(),
                output_dir.display()
            );
            print_summary(&issues);
        }
    }

    Ok(())
}

fn print_summary(issues: &IssueTracker) {
    if issues.is_empty() {
        println!("\nNo issues found.");
        return;
    }

    println!("\nSummary of Issues:");
    for (category, messages) in issues.summary() {
        println!("\n{}:", category.label());
        for message in messages {
            println!("- {}", message);
        }
    }
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        bail!("No input provided");
    }
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = prompt(&format!("{} (y/n): ", question))?;
    Ok(answer.to_lowercase().starts_with('y'))
}

/// Remove everything inside a directory, keeping the directory itself.
fn clear_directory(dir: &Path) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
