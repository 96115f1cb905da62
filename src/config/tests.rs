use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cache_defaults_match_freshness_windows() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.redis_url, None);
    assert_eq!(settings.cache.pool_size.get(), DEFAULT_CACHE_POOL_SIZE);
    assert_eq!(settings.cache.task_list_ttl, Duration::from_secs(30));
    assert_eq!(settings.cache.dashboard_ttl, Duration::from_secs(10));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.dashboard_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.dashboard_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn blank_urls_are_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    raw.cache.redis_url = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url, None);
    assert_eq!(settings.cache.redis_url, None);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_log_level_is_reported() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());

    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["taskmaster"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_cache_overrides() {
    let args = CliArgs::parse_from([
        "taskmaster",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--cache-enabled",
        "false",
        "--cache-task-list-ttl-seconds",
        "5",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.cache_enabled, Some(false));
            assert_eq!(serve.overrides.cache_task_list_ttl_seconds, Some(5));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_seed_arguments() {
    let args = CliArgs::parse_from([
        "taskmaster",
        "seed",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("seed command") {
        Command::Seed(database) => {
            assert_eq!(database.database_url.as_deref(), Some("postgres://example"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn database_override_applies_to_migrate() {
    let mut raw = RawSettings::default();
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://migrate".to_string()),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://migrate"));
}
