use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use script_client::{
    ClientConfig, FilterCriteria, HttpQuestionService, ResumeFile, ScriptActions,
};
use shared_types::{Breadth, Depth, Persona, Question};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "script-client",
    about = "Generate an interview script from a resume",
    version
)]
struct Args {
    /// Resume to upload (PDF, DOCX or plain text)
    resume: PathBuf,

    /// Only show questions with this breadth
    #[arg(short, long)]
    breadth: Option<Breadth>,

    /// Only show questions with this persona
    #[arg(short, long)]
    persona: Option<Persona>,

    /// Only show questions with this depth (0-3)
    #[arg(short, long)]
    depth: Option<u8>,

    /// Override SCRIPT_API_BASE
    #[arg(long)]
    api_base: Option<String>,

    /// Save the generated script after printing it
    #[arg(short, long)]
    save: bool,

    /// Print the filtered questions as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "script_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(api_base) = args.api_base {
        config.api_base = api_base.trim_end_matches('/').to_string();
    }
    let depth = args
        .depth
        .map(|d| {
            Depth::new(d).ok_or_else(|| anyhow::anyhow!("--depth {d} is outside 0..={}", Depth::MAX))
        })
        .transpose()?;

    info!(api_base = %config.api_base, resume = %args.resume.display(), "script-client starting");

    let resume = ResumeFile::read(&args.resume)
        .await
        .with_context(|| format!("Failed to read resume {}", args.resume.display()))?;

    let generation = config.generation;
    let service = HttpQuestionService::new(config)?;
    let actions = ScriptActions::new(service, generation);

    let report = actions.generate(&resume).await?;
    if !report.rejected.is_empty() {
        eprintln!(
            "{} generated question(s) were malformed and skipped",
            report.rejected.len()
        );
    }

    let mut browser = actions.browser();
    browser.set_criteria(FilterCriteria {
        breadth: args.breadth,
        persona: args.persona,
        depth,
    });
    let labels = browser.criteria().active_labels();
    let view = browser.view().to_vec();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        if !labels.is_empty() {
            println!("Filters: {}", labels.join(", "));
        }
        println!(
            "{} of {} questions\n",
            view.len(),
            actions.store().len()
        );
        for (number, question) in view.iter().enumerate() {
            print_question(number + 1, question);
        }
    }

    if args.save {
        actions.save_script().await?;
        info!(questions = actions.store().len(), "Script saved");
    }

    Ok(())
}

fn print_question(number: usize, question: &Question) {
    let controls = &question.controls;
    println!(
        "{number}. {} [{} | {} | depth {}]",
        question.main_question,
        controls.breadth,
        controls.persona,
        controls.depth.label()
    );
    if let Some(claim) = &question.claim {
        println!("   claim: {claim}");
    }
    for follow_up in &question.follow_ups {
        println!("   - {}", follow_up.question);
        for nested in &follow_up.nested {
            println!("     - {nested}");
        }
    }
    println!();
}
