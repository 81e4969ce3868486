use clap::{Args, Parser, Subcommand};
use dumpdata_jekyll::config::{self, ConfigOverrides};
use dumpdata_jekyll::{output, pipeline, records, tree};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags shared by the commands that emit artifacts.
#[derive(Args, Clone, Default)]
struct EmitArgs {
    /// Skip page emission
    #[arg(long)]
    no_pages: bool,

    /// Skip blog post emission
    #[arg(long)]
    no_posts: bool,

    /// Layout named in page front matter
    #[arg(long)]
    page_layout: Option<String>,

    /// Layout named in post front matter
    #[arg(long)]
    post_layout: Option<String>,

    /// Convert HTML bodies to Markdown
    #[arg(long)]
    markdown: bool,

    /// Print merged records and the page forest as JSON before emitting
    #[arg(long)]
    print: bool,
}

#[derive(Parser)]
#[command(name = "dumpdata-jekyll")]
#[command(about = "Convert a CMS dumpdata export into a Jekyll source tree")]
#[command(long_about = "\
Convert a CMS dumpdata export into a Jekyll source tree

Reads a JSON array of page and blog post rows, merges rows that share a key,
rebuilds the page hierarchy from parent pointers and writes:

  project_dir/
  ├── home.md                      # one file per page, named after its slug
  ├── about.md
  ├── about/
  │   └── team.md                  # slugs containing '/' create directories
  └── _posts/
      └── 2021-3-5-hello-world.md  # one file per blog post

Every file starts with a YAML front-matter block (date, permalink, title,
description, layout, ...) followed by the body, with legacy links rewritten
onto {{ site.baseurl }}.

Run 'dumpdata-jekyll gen-config' to generate a documented export.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./export.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// dumpdata JSON export
    #[arg(long, global = true)]
    source: Option<String>,

    /// Jekyll source tree to write into
    #[arg(long, global = true)]
    project_dir: Option<String>,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the export and print the merged records as JSON
    Load,
    /// Print the page hierarchy
    Tree,
    /// Run the full pipeline without writing anything
    Check(EmitArgs),
    /// Run the full pipeline: load → tree → emit
    Build(EmitArgs),
    /// Print a stock export.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let emit_args = match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Check(args) | Command::Build(args) => args.clone(),
        Command::Load | Command::Tree => EmitArgs::default(),
    };

    let overrides = ConfigOverrides {
        source: cli.source.clone(),
        project_dir: cli.project_dir.clone(),
        print: emit_args.print.then_some(true),
        pages_enabled: emit_args.no_pages.then_some(false),
        posts_enabled: emit_args.no_posts.then_some(false),
        page_layout: emit_args.page_layout.clone(),
        post_layout: emit_args.post_layout.clone(),
        convert_markup: emit_args.markdown.then_some(true),
    };
    let config_file = config::find_config(cli.config.as_deref(), Path::new("."))?;
    let config = config::load_config(config_file.as_deref(), &overrides)?;

    match cli.command {
        Command::Load => {
            let content = records::load_file(Path::new(&config.source))?;
            output::print_json(&content)?;
        }
        Command::Tree => {
            let content = records::load_file(Path::new(&config.source))?;
            let forest = tree::build_forest(&content)?;
            output::print_forest(&forest);
        }
        Command::Check(_) => {
            println!("==> Checking {}", config.source);
            let prepared = pipeline::prepare(&config)?;
            output::print_load_output(&prepared.content);
            if config.print {
                output::print_json(&prepared.content)?;
                output::print_json(&prepared.forest)?;
            }
            let mut sink = dumpdata_jekyll::sink::MemorySink::new();
            let summary = pipeline::emit(&config, &prepared, &mut sink)?;
            output::print_check_output(&prepared.forest, &summary, &sink);
            println!("==> Export is valid");
        }
        Command::Build(_) => {
            println!("==> Stage 1: Loading {}", config.source);
            let prepared = pipeline::prepare(&config)?;
            output::print_load_output(&prepared.content);
            if config.print {
                output::print_json(&prepared.content)?;
            }

            println!("==> Stage 2: Page hierarchy");
            output::print_forest(&prepared.forest);
            if config.print {
                output::print_json(&prepared.forest)?;
            }

            println!("==> Stage 3: Writing \u{2192} {}", config.project_dir);
            let mut sink =
                dumpdata_jekyll::sink::FsSink::new(&config.project_dir, config.on_collision);
            let summary = pipeline::emit(&config, &prepared, &mut sink)?;
            output::print_build_output(&prepared.forest, &summary);

            println!("==> Build complete: {}", config.project_dir);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr. `--verbose` forces debug; otherwise `RUST_LOG`, else warn.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
