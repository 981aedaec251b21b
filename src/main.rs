//! Webpart - edit and view webpart markdown content from the terminal.
//!
//! # Usage
//!
//! ```bash
//! webpart edit 42
//! webpart view 42 --render-service http://localhost:8007/cm/servlet
//! webpart --heading-style atx --save
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use webpart::app::App;
use webpart::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use webpart::convert::{ConvertOptions, HeadingStyle, HtmlConverter};
use webpart::service::{ContentId, Endpoints, HttpContentService};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "WEBPART_LOG";

/// Terminal editor and viewer for webpart content
#[derive(Parser, Debug)]
#[command(name = "webpart", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base URL of the content service
    #[arg(long, global = true, value_name = "URL")]
    content_service: Option<String>,

    /// Base URL of the render service used by `view`
    #[arg(long, global = true, value_name = "URL")]
    render_service: Option<String>,

    /// Write logs to this file (filter with WEBPART_LOG)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Heading style for converted HTML content
    #[arg(long, global = true, value_enum)]
    heading_style: Option<HeadingStyle>,

    /// Start the editor with the preview hidden
    #[arg(long, global = true)]
    no_preview: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit the markdown of a webpart
    Edit {
        /// Webpart identifier
        id: String,
    },
    /// View the rendered text of a webpart
    View {
        /// Webpart identifier
        id: String,
    },
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            content_service: self.content_service.clone(),
            render_service: self.render_service.clone(),
            log_file: self.log_file.clone(),
            heading_style: self.heading_style,
            no_preview: self.no_preview,
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // The TUI owns the terminal, so without a log file logs are dropped.
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::sink),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let Some(command) = cli.command else {
        if cli.save || cli.clear {
            return Ok(());
        }
        Cli::command().print_help()?;
        return Ok(());
    };

    init_logging(effective.log_file.as_deref())?;
    let endpoints = Endpoints::from_flags(&effective);
    tracing::info!(
        content = endpoints.content_base(),
        render = endpoints.render_base(),
        "starting"
    );
    let service = Arc::new(
        HttpContentService::new(endpoints).context("Failed to create HTTP client")?,
    );

    let mut app = match command {
        Command::Edit { id } => {
            let converter = HtmlConverter::new(ConvertOptions {
                heading_style: effective.heading_style.unwrap_or_default(),
                ..ConvertOptions::default()
            });
            App::editor(ContentId::new(id), service)
                .with_converter(converter)
                .with_preview(!effective.no_preview)
        }
        Command::View { id } => App::viewer(ContentId::new(id), service),
    };

    app.run().context("Application error")
}
