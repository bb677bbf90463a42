//! Tests for add, run and start.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_add() {
    match parse(&["grabq", "add", "https://video.example/watch?v=1"]) {
        CliCommand::Add {
            urls,
            quality,
            format,
            folder,
            no_start,
        } => {
            assert_eq!(urls, vec!["https://video.example/watch?v=1".to_string()]);
            assert!(quality.is_none());
            assert!(format.is_none());
            assert!(folder.is_none());
            assert!(!no_start);
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_with_options() {
    match parse(&[
        "grabq",
        "add",
        "https://a.example/1",
        "https://a.example/2",
        "--quality",
        "720",
        "--format",
        "mp4",
        "--folder",
        "talks",
        "--no-start",
    ]) {
        CliCommand::Add {
            urls,
            quality,
            format,
            folder,
            no_start,
        } => {
            assert_eq!(urls.len(), 2);
            assert_eq!(quality.as_deref(), Some("720"));
            assert_eq!(format.as_deref(), Some("mp4"));
            assert_eq!(folder.as_deref(), Some("talks"));
            assert!(no_start);
        }
        _ => panic!("expected Add"),
    }
}

#[test]
fn cli_parse_add_requires_url() {
    assert!(Cli::try_parse_from(["grabq", "add"]).is_err());
}

#[test]
fn cli_parse_run() {
    assert!(matches!(parse(&["grabq", "run"]), CliCommand::Run));
}

#[test]
fn cli_parse_start() {
    match parse(&["grabq", "start", "id-1", "id-2"]) {
        CliCommand::Start { ids } => assert_eq!(ids, vec!["id-1", "id-2"]),
        _ => panic!("expected Start"),
    }
}
