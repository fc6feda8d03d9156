// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::required;
use crate::config::{self, SyncConfig, ACCESS_TOKEN_KEY};
use crate::store::Store;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(store: &Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = required(sub, "key")?;
            config::set(store, key, required(sub, "value")?)?;
            println!("{} updated", key);
        }
        Some(("show", _)) => show(store)?,
        _ => {}
    }
    Ok(())
}

fn show(store: &Store) -> Result<()> {
    let cfg = SyncConfig::load(store)?;
    let token = match &cfg.access_token {
        Some(_) => "(set)".to_string(),
        None => "(none)".to_string(),
    };
    let rows = vec![
        vec![config::API_BASE_URL_KEY.into(), cfg.api_base_url.clone()],
        vec![ACCESS_TOKEN_KEY.into(), token],
        vec![config::MAX_REJECTIONS_KEY.into(), cfg.max_rejections.to_string()],
        vec![
            config::BACKOFF_INITIAL_KEY.into(),
            cfg.backoff_initial.as_secs().to_string(),
        ],
        vec![
            config::BACKOFF_MAX_KEY.into(),
            cfg.backoff_max.as_secs().to_string(),
        ],
        vec![config::MAX_ATTEMPTS_KEY.into(), cfg.max_attempts.to_string()],
    ];
    println!("{}", pretty_table(&["Setting", "Value"], rows));
    Ok(())
}
