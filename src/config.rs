use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::convert::HeadingStyle;
use crate::service::{DEFAULT_CONTENT_SERVICE, DEFAULT_RENDER_SERVICE, Endpoints};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub content_service: Option<String>,
    pub render_service: Option<String>,
    pub log_file: Option<PathBuf>,
    pub heading_style: Option<HeadingStyle>,
    pub no_preview: bool,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            content_service: other
                .content_service
                .clone()
                .or_else(|| self.content_service.clone()),
            render_service: other
                .render_service
                .clone()
                .or_else(|| self.render_service.clone()),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
            heading_style: other.heading_style.or(self.heading_style),
            no_preview: self.no_preview || other.no_preview,
        }
    }
}

impl Endpoints {
    /// Service bases from `flags`, falling back to the built-in defaults.
    pub fn from_flags(flags: &ConfigFlags) -> Self {
        Self::new(
            flags
                .content_service
                .as_deref()
                .unwrap_or(DEFAULT_CONTENT_SERVICE),
            flags
                .render_service
                .as_deref()
                .unwrap_or(DEFAULT_RENDER_SERVICE),
        )
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("webpart").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("webpart")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("webpart").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("webpart")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".webpartrc")
}

/// Read flag tokens from a config file. A missing file yields no flags.
///
/// # Errors
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    let flags = parse_flag_tokens(&tokens);
    tracing::debug!(path = %path.display(), ?flags, "config loaded");
    Ok(flags)
}

/// Write `flags` to `path`, one flag per line.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# webpart defaults (saved with --save)".to_string()];
    if let Some(url) = &flags.content_service {
        lines.push(format!("--content-service {url}"));
    }
    if let Some(url) = &flags.render_service {
        lines.push(format!("--render-service {url}"));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(style) = flags.heading_style {
        let style = match style {
            HeadingStyle::Setext => "setext",
            HeadingStyle::Atx => "atx",
        };
        lines.push(format!("--heading-style {style}"));
    }
    if flags.no_preview {
        lines.push("--no-preview".to_string());
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of a token list; everything else is skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value.to_string())),
            _ => (token, None),
        };
        let takes_value = matches!(
            name,
            "--content-service" | "--render-service" | "--log-file" | "--heading-style"
        );
        let value = if takes_value && inline_value.is_none() {
            let next = tokens.get(i + 1).cloned();
            if next.is_some() {
                i += 1;
            }
            next
        } else {
            inline_value
        };

        match name {
            "--content-service" => flags.content_service = value,
            "--render-service" => flags.render_service = value,
            "--log-file" => flags.log_file = value.map(PathBuf::from),
            "--heading-style" => flags.heading_style = value.as_deref().and_then(parse_heading_style),
            "--no-preview" => flags.no_preview = true,
            _ => {}
        }
        i += 1;
    }
    flags
}

fn parse_heading_style(s: &str) -> Option<HeadingStyle> {
    match s {
        "setext" => Some(HeadingStyle::Setext),
        "atx" => Some(HeadingStyle::Atx),
        _ => None,
    }
}
