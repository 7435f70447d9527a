use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tabletop_sync::SettingSource;

use crate::CliError;

/// Show effective settings and where each came from.
pub(crate) fn run_config_show(database: Option<PathBuf>) -> Result<(), CliError> {
    let settings = crate::load_settings(database)?;

    println!(
        "{}",
        "Tabletop Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    println!();

    match tabletop_sync::config_path() {
        Some(p) if p.exists() => println!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        ),
        Some(p) => println!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        ),
        None => println!(
            "  Config file: {}",
            "could not determine path".if_supports_color(Stdout, |t| t.red()),
        ),
    }
    println!();

    for (key, value, source) in settings.entries() {
        let source_text = format!("({})", source);
        let source_display = match source {
            SettingSource::Default | SettingSource::Missing => source_text
                .if_supports_color(Stdout, |t| t.dimmed())
                .to_string(),
            _ => source_text
                .if_supports_color(Stdout, |t| t.yellow())
                .to_string(),
        };
        println!("  {:<24} {} {}", key, value, source_display);
    }

    Ok(())
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    match tabletop_sync::config_path() {
        Some(p) => {
            println!("{}", p.display());
            Ok(())
        }
        None => Err(CliError::config("Could not determine config directory")),
    }
}
