mod config;
mod fetch;
mod tui;

use std::{env, path::PathBuf};

use arbor_fs::{LocalSource, OutputsSource, SourceError};
use arbor_tree::OutputsListing;
use arbor_view::IconKind;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use thiserror::Error;

pub use crate::config::{Config, ConfigError};
use crate::tui::{TuiError, tui};

#[derive(Parser, Debug)]
#[command(name = "arbor", version, about = "Browse run outputs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Cmd,

    #[arg(long = "config", env = "ARBOR_CONFIG", global = true)]
    pub config_path: Option<PathBuf>,

    #[arg(long = "log", env = "ARBOR_LOG", global = true)]
    pub log: Option<String>,

    #[doc = " Outputs directory to browse"]
    #[arg(long = "root", env = "ARBOR_ROOT", global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    #[doc = " Browse outputs in the terminal"]
    Browse,
    #[doc = " Print one outputs directory listing"]
    Ls {
        #[doc = " Directory relative to the outputs root"]
        #[arg(default_value = "")]
        path: String,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Tui(#[from] TuiError),
}

pub async fn get_config(cli: &Cli) -> Result<Config, AppError> {
    let (config_path, required) = match cli.config_path.clone() {
        Some(path) => (path, true),
        None => (
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            false,
        ),
    };
    let config = Config::load(&config_path, cli, required).await?;
    Ok(config)
}

pub async fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    match cli.command {
        Cmd::Browse => cmd_browse(config).await,
        Cmd::Ls { path } => cmd_ls(config, path).await,
    }
}

async fn cmd_browse(config: Config) -> Result<(), AppError> {
    tui(&config).await?;
    Ok(())
}

async fn cmd_ls(config: Config, path: String) -> Result<(), AppError> {
    let source = LocalSource::new(&config.root, config.preview_max_bytes);
    let listing = source.list(&path).await?;
    println!("{}", listing_table(&listing));
    Ok(())
}

fn listing_table(listing: &OutputsListing) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .set_header(vec!["name", "kind", "icon", "size"]);

    for dir in listing.dirs.iter() {
        table.add_row(vec![
            dir.to_string(),
            "dir".to_string(),
            IconKind::Folder.to_string(),
            String::new(),
        ]);
    }
    for file in listing.files.iter() {
        table.add_row(vec![
            file.name.clone(),
            "file".to_string(),
            IconKind::from_name(&file.name).to_string(),
            file.size.to_string(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_tree::OutputsFileEntry;

    fn cells(row: &comfy_table::Row) -> Vec<String> {
        row.cell_iter().map(|cell| cell.content()).collect()
    }

    #[test]
    fn listing_table_shows_kind_icon_and_size() {
        let listing = OutputsListing {
            dirs: vec!["logs".into()],
            files: vec![OutputsFileEntry {
                name: "plot.png".into(),
                size: 42,
            }],
        };

        let table = listing_table(&listing);

        assert_eq!(
            cells(table.header().unwrap()),
            vec!["name", "kind", "icon", "size"]
        );
        assert_eq!(
            cells(table.row(0).unwrap()),
            vec!["logs", "dir", "folder", ""]
        );
        assert_eq!(
            cells(table.row(1).unwrap()),
            vec!["plot.png", "file", "file-image-o", "42"]
        );
    }
}
