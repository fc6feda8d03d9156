// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn tracker_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("name").long("name").required(required))
        .arg(Arg::new("description").long("description"))
        .arg(Arg::new("budget").long("budget").required(required))
        .arg(
            Arg::new("start")
                .long("start")
                .required(required)
                .help("YYYY-MM-DD"),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .required(required)
                .help("YYYY-MM-DD"),
        )
}

pub fn build_cli() -> Command {
    Command::new("spendsync")
        .about("Offline-first expense tracker with background server sync")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the local database"))
        .subcommand(
            Command::new("tracker")
                .about("Budgeting periods")
                .subcommand(tracker_fields(
                    Command::new("create").about("Create a tracker on the server"),
                    true,
                ))
                .subcommand(tracker_fields(
                    Command::new("update")
                        .about("Update a tracker; omitted fields keep their cached values")
                        .arg(Arg::new("id").required(true)),
                    false,
                ))
                .subcommand(json_args(Command::new("list").about("Cached trackers")))
                .subcommand(json_args(
                    Command::new("current").about("Tracker with the latest start date"),
                ))
                .subcommand(Command::new("refresh").about("Replace cached trackers with the server's")),
        )
        .subcommand(
            Command::new("expense")
                .about("Expenses")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("date")
                                .long("date")
                                .required(true)
                                .help("YYYY-MM-DD"),
                        )
                        .arg(
                            Arg::new("tracker")
                                .long("tracker")
                                .help("Defaults to the current tracker"),
                        ),
                )
                .subcommand(json_args(
                    Command::new("list")
                        .arg(Arg::new("tracker").long("tracker"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .arg(
                            Arg::new("watch")
                                .long("watch")
                                .action(ArgAction::SetTrue)
                                .help("Keep printing as the list changes"),
                        ),
                ))
                .subcommand(
                    Command::new("refresh")
                        .about("Merge the server's expenses for one tracker")
                        .arg(Arg::new("tracker").long("tracker")),
                )
                .subcommand(Command::new("delete").arg(Arg::new("id").required(true)))
                .subcommand(
                    Command::new("requeue")
                        .about("Give a quarantined expense another chance")
                        .arg(Arg::new("id").required(true)),
                )
                .subcommand(json_args(
                    Command::new("pending").about("Rows not yet confirmed by the server"),
                )),
        )
        .subcommand(
            Command::new("sync")
                .about("Server reconciliation")
                .subcommand(Command::new("now").about("Push pending changes once"))
                .subcommand(Command::new("all").about("Pull trackers and expenses from the server"))
                .subcommand(json_args(Command::new("status"))),
        )
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("show")),
        )
        .subcommand(Command::new("doctor").about("Report sync problems"))
}
