use super::open_store;
use crate::output::{print_json, print_table};
use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde::Serialize;
use std::path::Path;
use watchcat_core::{MarkerStore, RepositoryTarget, TargetKind};

#[derive(Subcommand, Debug)]
pub enum StateSubcommand {
    /// List every stored marker
    List {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },
    /// Print the stored marker of one target
    Get {
        /// Repository as owner/name
        repo: String,
        /// release, commit, issue, pull_request (pr) or tag
        kind: TargetKind,
    },
}

#[derive(Serialize)]
struct MarkerRow {
    owner: String,
    name: String,
    kind: TargetKind,
    marker: String,
}

pub fn run(db: Option<&Path>, subcommand: StateSubcommand) -> Result<()> {
    match subcommand {
        StateSubcommand::List { json } => list(db, json),
        StateSubcommand::Get { repo, kind } => get(db, &repo, kind),
    }
}

fn list(db: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(db)?;
    let rows: Vec<MarkerRow> = store
        .list_markers()?
        .into_iter()
        .map(|(target, marker)| MarkerRow {
            owner: target.owner,
            name: target.name,
            kind: target.kind,
            marker,
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No markers stored.");
        return Ok(());
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                format!("{}/{}", r.owner, r.name),
                r.kind.to_string(),
                r.marker.clone(),
            ]
        })
        .collect();
    print_table(&["REPO", "KIND", "MARKER"], &table);
    Ok(())
}

fn get(db: Option<&Path>, repo: &str, kind: TargetKind) -> Result<()> {
    let (owner, name) = repo
        .split_once('/')
        .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
        .ok_or_else(|| anyhow!("expected owner/name, got '{repo}'"))?;
    let target = RepositoryTarget::new(owner, name, kind);

    let store = open_store(db)?;
    match store.get(&target)? {
        Some(marker) => {
            println!("{marker}");
            Ok(())
        }
        None => Err(anyhow!("{target}: no {kind} observed yet")),
    }
}
