// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{CommandFactory, Parser};

use super::*;

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn compact_accepts_name_or_all() {
    let cli = Cli::try_parse_from(["cx", "compact", "--all"]).unwrap();
    assert!(matches!(cli.command, Commands::Compact { name: None, all: true }));

    let cli = Cli::try_parse_from(["cx", "compact", "digest"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Compact { name: Some(ref n), all: false } if n == "digest"
    ));
}

#[test]
fn costs_defaults_to_agent_grouping() {
    let cli = Cli::try_parse_from(["cx", "costs"]).unwrap();
    assert!(matches!(cli.command, Commands::Costs { by: CostGrouping::Agent, period: None }));

    let cli = Cli::try_parse_from(["cx", "costs", "--by", "category"]).unwrap();
    assert!(matches!(cli.command, Commands::Costs { by: CostGrouping::Category, .. }));
}

#[test]
fn costs_accepts_a_period() {
    let cli = Cli::try_parse_from(["cx", "costs", "--period", "2026-03"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Costs { period: Some(ref p), .. } if p == "2026-03"
    ));
}

#[test]
fn list_filters_are_optional() {
    let cli = Cli::try_parse_from(["cx", "list"]).unwrap();
    assert!(matches!(cli.command, Commands::List(ref f) if *f == ListFilter::default()));

    let cli =
        Cli::try_parse_from(["cx", "list", "--mode", "watcher", "--category", "mail"]).unwrap();
    let Commands::List(filter) = cli.command else { panic!("expected list") };
    assert_eq!(filter.mode.as_deref(), Some("watcher"));
    assert_eq!(filter.category.as_deref(), Some("mail"));
    assert_eq!(filter.status, None);
}

#[test]
fn logs_defaults_to_last_five() {
    let cli = Cli::try_parse_from(["cx", "logs", "digest"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Logs { ref name, last: 5, full: false } if name == "digest"
    ));
    let cli = Cli::try_parse_from(["cx", "logs", "digest", "--last", "2", "--full"]).unwrap();
    assert!(matches!(cli.command, Commands::Logs { last: 2, full: true, .. }));
}

#[test]
fn test_watcher_takes_a_name() {
    let cli = Cli::try_parse_from(["cx", "test-watcher", "inbox"]).unwrap();
    assert!(matches!(cli.command, Commands::TestWatcher { ref name } if name == "inbox"));
    assert!(Cli::try_parse_from(["cx", "test-watcher"]).is_err());
}

#[test]
fn output_flag_is_global() {
    let cli = Cli::try_parse_from(["cx", "status", "-o", "json"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
}

#[test]
fn mutations_require_a_name() {
    assert!(Cli::try_parse_from(["cx", "pause"]).is_err());
}
