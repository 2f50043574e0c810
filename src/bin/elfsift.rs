//! Command-line front end for the elfsift analysis engine.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use elfsift::{logging, AnalyzeOptions, Analyzer, FilterSpec};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

/// Analyze an ELF binary and print a report.
#[derive(Parser)]
#[command(name = "elfsift", version, about)]
struct Cli {
    /// ELF file to analyze.
    path: PathBuf,

    /// JSON options file; flags given on the command line override it.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Maximum number of sections listed in the report.
    #[arg(long)]
    max_sections: Option<usize>,

    /// Length of each hotspot list and import sample.
    #[arg(long, short = 'n')]
    top_n: Option<usize>,

    /// Keep raw symbol names.
    #[arg(long)]
    no_demangle: bool,

    /// Only report names containing this substring.
    #[arg(long, conflicts_with = "regex")]
    include: Option<String>,

    /// Only report names matching this case-insensitive regex.
    #[arg(long)]
    regex: Option<String>,

    /// Output format.
    #[arg(long, short = 'f', value_enum, default_value = "json")]
    format: OutputFormat,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn options(&self) -> Result<AnalyzeOptions> {
        let mut opts = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                AnalyzeOptions::from_json_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => AnalyzeOptions::default(),
        };

        if let Some(max) = self.max_sections {
            opts.max_sections = max;
        }
        if let Some(n) = self.top_n {
            opts.top_n = n;
        }
        if self.no_demangle {
            opts.demangle = false;
        }
        if self.include.is_some() || self.regex.is_some() {
            opts.filters = Some(FilterSpec {
                include: self.include.clone(),
                regex: self.regex.clone(),
            });
        }
        Ok(opts)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        logging::init_tracing_json();
    } else {
        logging::init_tracing();
    }

    let options = cli.options()?;
    let analyzer = match cli.format {
        OutputFormat::Json => Analyzer::new(options).without_renderer(),
        OutputFormat::Markdown => Analyzer::new(options),
    };
    let report = analyzer
        .analyze_path(&cli.path)
        .with_context(|| format!("analyzing {}", cli.path.display()))?;

    match cli.format {
        OutputFormat::Json => println!("{}", report.to_json_string()?),
        OutputFormat::Markdown => {
            let markdown = report
                .render
                .map(|r| r.markdown)
                .context("report rendering failed")?;
            print!("{}", markdown);
        }
    }
    Ok(())
}
