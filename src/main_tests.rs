// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - argument parsing and configuration loading

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use std::path::Path;

    use crate::{load_config, require_root, Cli, Command};

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_arguments() {
        let cli = Cli::try_parse_from([
            "zonesync",
            "--root",
            "zs.example.com",
            "sync",
            "--topology",
            "fleet.yaml",
            "--zone",
            "zone.yaml",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.root.as_deref(), Some("zs.example.com"));
        match cli.command {
            Command::Sync {
                zone,
                dry_run,
                metrics_file,
            } => {
                assert!(dry_run);
                assert!(metrics_file.is_none());
                assert_eq!(zone.zone_id, "local");
                assert_eq!(zone.topology, Path::new("fleet.yaml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_arguments() {
        let cli = Cli::try_parse_from([
            "zonesync",
            "resolve",
            "web.sg.zs.example.com",
            "-r",
            "--full",
        ])
        .unwrap();

        match cli.command {
            Command::Resolve {
                name,
                recursive,
                full,
                nameserver,
                best_effort,
            } => {
                assert_eq!(name, "web.sg.zs.example.com");
                assert!(recursive);
                assert!(full);
                assert!(nameserver.is_none());
                assert!(!best_effort);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_plan_requires_topology() {
        assert!(Cli::try_parse_from(["zonesync", "plan", "--zone", "zone.yaml"]).is_err());
    }

    #[tokio::test]
    async fn test_root_argument_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonesync.yaml");
        std::fs::write(&path, "root: zs.example.com\nweighted_cnames: true\n").unwrap();

        let config = load_config(Some(&path), Some("other.example.com")).await.unwrap();

        assert_eq!(config.root, "other.example.com");
        assert!(config.weighted_cnames);
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load_config(Some(&dir.path().join("absent.yaml")), None)
            .await
            .is_err());
    }

    #[test]
    fn test_empty_root_is_rejected() {
        let mut config = zonesync::config::Config::default();
        assert!(require_root(&config).is_err());

        config.root = "zs.example.com".to_string();
        assert!(require_root(&config).is_ok());
    }
}
