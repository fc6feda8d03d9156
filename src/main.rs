// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::sync::Arc;

use spendsync::{cli, commands, db};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let store = Arc::new(db::open_or_init()?);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::settings::handle(&store, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&store)?,
        Some((name @ ("tracker" | "expense" | "sync"), sub)) => {
            let app = commands::App::connect(Arc::clone(&store))?;
            let result = match name {
                "tracker" => commands::trackers::handle(&app, sub),
                "expense" => commands::expenses::handle(&app, sub),
                _ => commands::sync::handle(&app, sub),
            };
            let status = app.finish();
            result?;
            let status = status?;
            if !status.is_clean() {
                println!(
                    "{} change(s) not yet on the server; run `spendsync sync now` to push them.",
                    status.pending_creates + status.pending_deletes
                );
            }
        }
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
