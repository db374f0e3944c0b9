//! Test for hot reload functionality
//!
//! The process-wide snapshot is shared by every test in this file, so each
//! one runs serially and starts from a cleared manager.

use serial_test::serial;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tlsfront::config::manager::{self, ConfigChangeEvent};
use tlsfront::config::{resolve, Configuration, Outcome};

fn args(list: &[&str]) -> Vec<String> {
    std::iter::once("tlsfront")
        .chain(list.iter().copied())
        .map(String::from)
        .collect()
}

fn resolved(list: &[&str]) -> Configuration {
    match resolve(args(list)).expect("configuration should resolve") {
        Outcome::Run(config) => config,
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
#[serial]
fn test_install_and_current() {
    manager::reset();
    assert!(manager::current().is_none());

    let installed = manager::install(resolved(&["--client", "-n", "3"]));
    let current = manager::current().unwrap();

    assert!(Arc::ptr_eq(&installed, &current));
    assert_eq!(current.workers, 3);
}

#[test]
#[serial]
fn test_hot_reload() {
    manager::reset();

    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("tlsfront.conf");
    fs::write(&conf, "workers = 2\n").unwrap();
    let conf = conf.to_string_lossy().into_owned();

    let first = manager::reload(args(&["--client", "--config", &conf])).unwrap();
    assert_eq!(first.workers, 2);

    fs::write(&conf, "workers = 6\n").unwrap();
    let second = manager::reload(args(&["--client", "--config", &conf])).unwrap();
    assert_eq!(second.workers, 6);

    // Snapshots handed out earlier are never mutated
    assert_eq!(first.workers, 2);
    assert_eq!(manager::current().unwrap().workers, 6);
}

#[test]
#[serial]
fn test_failed_reload_keeps_previous_snapshot() {
    manager::reset();

    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("tlsfront.conf");
    fs::write(&conf, "backlog = 64\n").unwrap();
    let conf = conf.to_string_lossy().into_owned();

    manager::reload(args(&["--client", "--config", &conf])).unwrap();

    fs::write(&conf, "backlog = sixty-four\n").unwrap();
    assert!(manager::reload(args(&["--client", "--config", &conf])).is_err());
    assert_eq!(manager::current().unwrap().backlog, 64);

    // Help is not a configuration
    assert!(manager::reload(args(&["-h"])).is_err());
    assert_eq!(manager::current().unwrap().backlog, 64);
}

#[test]
#[serial]
fn test_listeners_are_notified() {
    manager::reset();

    let installs = Arc::new(AtomicUsize::new(0));
    let reloads = Arc::new(AtomicUsize::new(0));
    {
        let installs = Arc::clone(&installs);
        let reloads = Arc::clone(&reloads);
        manager::add_listener(move |event, _config| match event {
            ConfigChangeEvent::Installed => {
                installs.fetch_add(1, Ordering::SeqCst);
            }
            ConfigChangeEvent::Reloaded => {
                reloads.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    manager::install(resolved(&["--client"]));
    manager::reload(args(&["--client"])).unwrap();
    assert!(manager::reload(args(&["--client", "--workers=x"])).is_err());

    assert_eq!(installs.load(Ordering::SeqCst), 1);
    assert_eq!(reloads.load(Ordering::SeqCst), 1);

    manager::reset();
}
