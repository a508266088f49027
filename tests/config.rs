// tests/config.rs

use std::io::Write;
use std::path::PathBuf;

use assetpipe::config::defaults::DEFAULT_PIPELINE;
use assetpipe::config::{ConfigFile, load_and_validate, load_or_default, parse_and_validate};
use assetpipe::dag::{ActionKind, TaskAction};
use assetpipe::errors::{ConfigError, PipelineError};
use assetpipe::watch::WatchSubscriptions;
use assetpipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

fn config_error(toml: &str) -> ConfigError {
    match parse_and_validate(toml) {
        Err(PipelineError::Config(err)) => err,
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("expected a configuration error, got a valid pipeline"),
    }
}

#[test]
fn default_pipeline_is_valid() {
    let cfg = parse_and_validate(DEFAULT_PIPELINE).unwrap();
    let graph = cfg.graph();

    assert_eq!(cfg.targets(), ["build"]);
    assert_eq!(
        cfg.serve_targets(),
        ["styles", "scripts", "vendor", "fonts", "pages"]
    );
    assert!(graph.depends_transitively("build", "styles"));
    assert!(graph.depends_transitively("extras", "html"));
    assert_eq!(graph.task("lint").unwrap().kind(), ActionKind::Command);

    let build = graph.closure(cfg.targets()).unwrap();
    assert!(build.contains("lint"));
    // `clean` is only run on request.
    assert!(!build.contains("clean"));
    assert!(!build.contains("pages"));
}

#[test]
fn default_pipeline_serves_sources_and_vendor_mount_only() {
    let cfg = parse_and_validate(DEFAULT_PIPELINE).unwrap();

    assert_eq!(
        cfg.serve.roots,
        [PathBuf::from(".tmp"), PathBuf::from("app/assets")]
    );
    assert_eq!(
        cfg.serve.mounts.get("/bower_components"),
        Some(&PathBuf::from("bower_components"))
    );
    assert!(!cfg.serve.roots.contains(&PathBuf::from(".")));
}

#[test]
fn default_serve_subscriptions_cover_pages_and_images() {
    let cfg = parse_and_validate(DEFAULT_PIPELINE).unwrap();
    let closure = cfg.graph().closure(cfg.serve_targets()).unwrap();
    let subs = WatchSubscriptions::from_graph(cfg.graph(), &closure).unwrap();
    let tasks_for = |path: &str| subs.tasks_for(path).into_iter().collect::<Vec<_>>();

    for path in ["app/assets/index.html", "app/assets/images/logo.png"] {
        assert_eq!(tasks_for(path), ["pages"], "{path}");
    }
    assert_eq!(tasks_for("app/assets/js/main.js"), ["scripts"]);
}

#[test]
fn mount_prefixes_must_be_absolute_url_paths() {
    for prefix in ["bower_components", "/", "/vendor/"] {
        let toml = format!(
            r#"
[serve.mounts]
"{prefix}" = "bower_components"

[task.fonts]
action = "copy"
inputs = ["app/fonts/**/*"]
output = "public/fonts"
"#
        );
        assert!(
            matches!(config_error(&toml), ConfigError::Invalid(msg) if msg.contains("[serve.mounts]")),
            "{prefix}"
        );
    }
}

#[test]
fn sections_fall_back_to_defaults() {
    let cfg = parse_and_validate(
        r#"
[task.fonts]
action = "copy"
inputs = ["app/fonts/**/*"]
output = "public/fonts"
"#,
    )
    .unwrap();

    assert_eq!(cfg.config.debounce_ms, 200);
    assert!(!cfg.config.skip_unchanged);
    assert!(cfg.config.effective_concurrency() >= 1);
    assert_eq!(cfg.serve.port, 9000);
    assert_eq!(cfg.serve.livereload_port, 35729);
    assert_eq!(cfg.targets(), ["fonts"]);
    assert_eq!(cfg.serve_targets(), ["fonts"]);
}

#[test]
fn task_tables_map_onto_actions() {
    let cfg = parse_and_validate(
        r#"
[config]
concurrency = 3

[task.scripts]
action = "scripts"
bundler = "esbuild"
minify = true
inputs = ["app/js/**/*.js"]
entries = ["app/js/main.js"]
output = ".tmp/scripts"

[task.images]
action = "images"
inputs = ["app/img/**/*"]
output = "public/img"
quality = 70
"#,
    )
    .unwrap();

    assert_eq!(cfg.config.effective_concurrency(), 3);
    let scripts = cfg.graph().task("scripts").unwrap();
    assert_eq!(scripts.source_globs(), ["app/js/main.js"]);
    match &scripts.action {
        TaskAction::Scripts(opts) => {
            assert_eq!(opts.bundler, assetpipe::adapters::Bundler::Esbuild);
            assert!(opts.minify);
        }
        other => panic!("unexpected action {other:?}"),
    }
    match &cfg.graph().task("images").unwrap().action {
        TaskAction::Images(opts) => assert_eq!(opts.quality, 70),
        other => panic!("unexpected action {other:?}"),
    }
}

#[test]
fn empty_pipeline_is_rejected() {
    assert_eq!(config_error("[config]\ndebounce_ms = 100\n"), ConfigError::EmptyPipeline);
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = config_error("[config]\nconcurrency = 0\n[task.a]\naction = \"group\"\n");
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("concurrency")));
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = config_error("[task.a]\naction = \"group\"\nafter = [\"b\"]\n");
    assert!(matches!(err, ConfigError::InvalidDependency { .. }));
}

#[test]
fn cycle_is_rejected() {
    let err = config_error(
        "[task.a]\naction = \"group\"\nafter = [\"b\"]\n[task.b]\naction = \"group\"\nafter = [\"a\"]\n",
    );
    assert!(matches!(err, ConfigError::CyclicDependency { members } if members == ["a", "b"]));
}

#[test]
fn invalid_glob_names_task_and_pattern() {
    let err = config_error(
        "[task.css]\naction = \"copy\"\ninputs = [\"app/{a,b.css\"]\noutput = \"public\"\n",
    );
    match err {
        ConfigError::InvalidGlob { task, pattern, .. } => {
            assert_eq!(task, "css");
            assert_eq!(pattern, "app/{a,b.css");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn writers_need_an_output_directory() {
    let err = config_error("[task.fonts]\naction = \"copy\"\ninputs = [\"*.woff\"]\n");
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("output")));
}

#[test]
fn command_needs_cmd() {
    let err = config_error("[task.lint]\naction = \"command\"\ncmd = \"  \"\n");
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("cmd")));
}

#[test]
fn unknown_target_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::group().build())
        .with_targets(&["b"])
        .raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert_eq!(err, ConfigError::UnknownTarget("b".to_string()));
}

#[test]
fn unordered_writers_sharing_output_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_task(
            "html",
            TaskConfigBuilder::new(ActionKind::Copy).input("a/*").output("public").build(),
        )
        .with_task(
            "extras",
            TaskConfigBuilder::new(ActionKind::Copy).input("b/*").output("public").build(),
        )
        .raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, ConfigError::SharedOutputDir { .. }));
}

#[test]
fn builder_pipeline_resolves_serve_targets() {
    let cfg = ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::new(ActionKind::Clean).path("public").build())
        .with_task(
            "styles",
            TaskConfigBuilder::new(ActionKind::Styles)
                .input("app/sass/**/*.scss")
                .output(".tmp/styles")
                .build(),
        )
        .with_task("build", TaskConfigBuilder::group().after("styles").build())
        .with_serve_targets(&["styles"])
        .with_debounce_ms(50)
        .build();

    assert_eq!(cfg.targets(), ["build"]);
    assert_eq!(cfg.serve_targets(), ["styles"]);
    assert_eq!(cfg.config.debounce_ms, 50);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(
        parse_and_validate("[task.a\naction = 1"),
        Err(PipelineError::Toml(_))
    ));
}

#[test]
fn files_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[task.lint]\naction = \"command\"\ncmd = \"true\"").unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.targets(), ["lint"]);

    // An explicit path that does not exist is an error, not the default.
    assert!(load_or_default(file.path().with_extension("missing")).is_err());
}
