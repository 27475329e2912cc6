#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use saucedb::shell::{
    Args, Command, DispatchError, Flow, Kind, Registry, RegistryError, Shell, Value,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Records every invocation it receives
#[derive(Default)]
struct Recorder {
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Args)>>,
}

impl Recorder {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, name: &str, args: Args) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((name.to_string(), args));
    }

    fn names(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

fn registry() -> Registry<Recorder> {
    let mut registry = Registry::new();
    registry
        .register(
            Command::new(["g", "get"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("get", args);
                Ok(Flow::Continue)
            })
            .params([Kind::Text, Kind::Text])
            .doc("Find by column\n\nExamples:\n    g id 1"),
        )
        .unwrap();
    registry
        .register(
            Command::new(["find"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("find", args);
                Ok(Flow::Continue)
            })
            .params([Kind::Text, Kind::Integer]),
        )
        .unwrap();
    registry
        .register(
            Command::new(["scale"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("scale", args);
                Ok(Flow::Continue)
            })
            .params([Kind::Float]),
        )
        .unwrap();
    registry
        .register(
            Command::new(["fail"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("fail", args);
                anyhow::bail!("disk full")
            })
            .doc("Always fails"),
        )
        .unwrap();
    registry
        .register(
            Command::new(["secret"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("secret", args);
                Ok(Flow::Continue)
            })
            .hidden(),
        )
        .unwrap();
    registry
        .register(
            Command::new(["q", "quit"], |recorder: Arc<Recorder>, args| async move {
                recorder.record("quit", args);
                Ok(Flow::Quit)
            })
            .doc("Exit"),
        )
        .unwrap();
    registry
}

fn shell() -> Shell<Recorder> {
    Shell::new(registry(), Arc::new(Recorder::default()))
}

#[tokio::test]
async fn test_unknown_command() {
    let shell = shell();
    let err = shell.dispatch("list").await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownCommand { ref name } if name == "list"));
    assert!(err.to_string().contains("help"));
    assert_eq!(shell.context().calls(), 0);
}

#[tokio::test]
async fn test_alias_lookup_is_case_sensitive() {
    let shell = shell();
    assert!(matches!(
        shell.dispatch("Q").await,
        Err(DispatchError::UnknownCommand { .. })
    ));
}

#[tokio::test]
async fn test_arity_mismatch_does_not_invoke() {
    let shell = shell();
    let err = shell.dispatch("get id").await.unwrap_err();

    assert!(matches!(
        err,
        DispatchError::ArityMismatch {
            expected: 2,
            got: 1,
            ..
        }
    ));
    assert_eq!(shell.context().calls(), 0);
}

#[tokio::test]
async fn test_coercion_failure_does_not_invoke() {
    let shell = shell();
    let err = shell.dispatch("find tag bigboobs").await.unwrap_err();

    match err {
        DispatchError::Coercion(coercion) => {
            assert_eq!(coercion.raw, "bigboobs");
            assert_eq!(coercion.kind, Kind::Integer);
        }
        other => panic!("expected a coercion error, got {other}"),
    }
    assert_eq!(shell.context().calls(), 0);
}

#[tokio::test]
async fn test_arguments_are_coerced_in_order() {
    let shell = shell();
    assert_eq!(shell.dispatch("find pages 42").await.unwrap(), Flow::Continue);
    assert_eq!(shell.dispatch("scale 1.5").await.unwrap(), Flow::Continue);

    let seen = shell.context().seen.lock().unwrap().clone();
    let (_, find) = seen.first().unwrap();
    assert_eq!(find.get(0), Some(&Value::Text("pages".to_string())));
    assert_eq!(find.integer(1).unwrap(), 42);

    let (_, scale) = seen.get(1).unwrap();
    assert!((scale.float(0).unwrap() - 1.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_quoted_argument_is_one_token() {
    let shell = shell();
    shell.dispatch(r#"g tags "big breasts""#).await.unwrap();

    let seen = shell.context().seen.lock().unwrap().clone();
    let (_, args) = seen.first().unwrap();
    assert_eq!(args.text(1).unwrap(), "big breasts");
}

#[tokio::test]
async fn test_handler_failure_is_reported_not_retried() {
    let shell = shell();
    let err = shell.dispatch("fail").await.unwrap_err();
    assert!(matches!(err, DispatchError::CommandFailed { ref command, .. } if command == "fail"));
    assert!(err.to_string().contains("disk full"));

    assert_eq!(shell.handle_line("fail").await, Flow::Continue);
    assert_eq!(shell.context().calls(), 2);
}

#[tokio::test]
async fn test_line_runs_sub_commands_until_quit() {
    let shell = shell();
    let flow = shell
        .handle_line("get id 1 ; nope ; find x y; secret ;; quit; get id 2")
        .await;

    assert_eq!(flow, Flow::Quit);
    assert_eq!(shell.context().names(), vec!["get", "secret", "quit"]);
}

#[tokio::test]
async fn test_run_lines_stops_at_quit() {
    let shell = shell();
    let flow = shell.run_lines(["get a b", "q", "get c d"]).await;

    assert_eq!(flow, Flow::Quit);
    assert_eq!(shell.context().names(), vec!["get", "quit"]);

    let shell = self::shell();
    assert_eq!(shell.run_lines(["", "get a b"]).await, Flow::Continue);
}

#[tokio::test]
async fn test_empty_input_and_help_are_noops() {
    let shell = shell();
    assert_eq!(shell.dispatch("   ").await.unwrap(), Flow::Continue);
    assert_eq!(shell.dispatch("help").await.unwrap(), Flow::Continue);
    assert_eq!(shell.dispatch("h get").await.unwrap(), Flow::Continue);
    assert!(matches!(
        shell.dispatch("help nope").await,
        Err(DispatchError::UnknownHelpTopic { .. })
    ));
    assert_eq!(shell.context().calls(), 0);
}

#[test]
fn test_hidden_commands_are_not_listed() {
    let registry = registry();

    let visible: Vec<&str> = registry
        .list(false)
        .into_iter()
        .flat_map(|(aliases, _)| aliases.iter().map(String::as_str))
        .collect();
    assert!(!visible.contains(&"secret"));
    assert!(visible.contains(&"get"));

    assert_eq!(registry.list(true).len(), registry.len());
    assert!(registry.resolve("secret").unwrap().is_hidden());
}

#[test]
fn test_summaries_and_help() {
    let registry = registry();
    let summaries: Vec<&str> = registry
        .list(true)
        .into_iter()
        .map(|(_, summary)| summary)
        .collect();

    assert_eq!(summaries.first(), Some(&"Find by column"));
    assert_eq!(summaries.get(1), Some(&"no documentation"));
    assert_eq!(
        registry.help("g").unwrap(),
        "Find by column\n\nExamples:\ng id 1"
    );
    assert!(registry.help("nope").is_none());
}

#[test]
fn test_duplicate_alias_is_a_registration_error() {
    let mut registry = registry();
    let before = registry.len();

    let err = registry
        .register(Command::new(["list", "g"], |_: Arc<Recorder>, _| async {
            Ok(Flow::Continue)
        }))
        .unwrap_err();

    assert_eq!(err, RegistryError::DuplicateAlias("g".to_string()));
    assert_eq!(registry.len(), before);
    assert!(registry.resolve("list").is_none());

    assert_eq!(
        registry
            .register(Command::new(["help"], |_: Arc<Recorder>, _| async {
                Ok(Flow::Continue)
            }))
            .unwrap_err(),
        RegistryError::ReservedAlias("help".to_string())
    );
}
