//! Configuration resolution tests
//!
//! Drive the public `resolve` entry point the way the binary does, with
//! real files in a temporary directory.

use std::fs;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tlsfront::config::{
    resolve, ConfigError, Configuration, Endpoint, ErrorKind, Outcome, ProxyMode, TlsProtocols,
    Toggle,
};

fn args(list: &[&str]) -> Vec<String> {
    std::iter::once("tlsfront")
        .chain(list.iter().copied())
        .map(String::from)
        .collect()
}

fn run(list: &[&str]) -> Result<Configuration, ConfigError> {
    match resolve(args(list))? {
        Outcome::Run(config) => Ok(config),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"-----BEGIN CERTIFICATE-----\n").unwrap();
    path
}

fn s(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_full_configuration_file() {
    let dir = tempfile::tempdir().unwrap();
    let global = touch(dir.path(), "global.pem");
    let site = touch(dir.path(), "site.pem");
    let ocsp = dir.path().join("ocsp");
    fs::create_dir(&ocsp).unwrap();

    let conf = dir.path().join("tlsfront.conf");
    fs::write(
        &conf,
        format!(
            r#"
frontend = {{
    host = "*"
    port = "443"
}}
frontend = {{
    host = "10.0.0.1"
    port = "8443"
    pem-file = "{site}"
}}
backend = "[127.0.0.1]:6000"
pem-file = "{global}"
alpn-protos = "h2, http/1.1"
tls-protos = "TLSv1.2 TLSv1.3"
ocsp-dir = "{ocsp}"
write-proxy-v2 = on
syslog-facility = "local3"
"#,
            site = site.display(),
            global = global.display(),
            ocsp = ocsp.display(),
        ),
    )
    .unwrap();

    let config = run(&["--config", &s(&conf)]).unwrap();

    assert_eq!(config.mode, ProxyMode::Server);
    assert_eq!(config.frontends.len(), 2);
    assert!(!config.frontends.is_synthetic_default());

    let wildcard = config.frontends.get("[]:443").unwrap();
    assert_eq!(wildcard.match_global_certs, Toggle::Enabled);

    let explicit = config.frontends.get("[10.0.0.1]:8443").unwrap();
    assert_eq!(explicit.certs.len(), 1);
    assert_eq!(explicit.match_global_certs, Toggle::Disabled);

    assert_eq!(config.certs.default.as_ref().unwrap().filename, global);
    assert_eq!(config.alpn.wire(), Some(&b"\x02h2\x08http/1.1"[..]));
    assert_eq!(config.alpn.wire_len(), 12);
    assert_eq!(config.tls_protos, Some(TlsProtocols::DEFAULT));
    assert_eq!(config.ocsp.dir, Some(ocsp));
    assert!(config.proxy.write_proxy_v2);
    assert_eq!(config.logging.syslog_facility.as_str(), "local3");
}

#[test]
fn test_error_in_file_names_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("bad.conf");
    fs::write(&conf, "workers = 2\nbacklog = lots\n").unwrap();

    let err = run(&["--client", "--config", &s(&conf)]).unwrap_err();
    assert!(err
        .to_string()
        .starts_with(&format!("Error in configuration file '{}', line 2", conf.display())));
    assert!(matches!(err.root_cause(), ConfigError::NotANumber(_)));
}

#[test]
fn test_unknown_file_key_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("tlsfront.conf");
    fs::write(&conf, "no-such-option = 1\nworkers = 3\n").unwrap();

    let config = run(&["--client", "--config", &s(&conf)]).unwrap();
    assert_eq!(config.workers, 3);
}

#[test]
fn test_missing_config_file() {
    let err = run(&["--client", "--config", "/nonexistent/tlsfront.conf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_no_certificate_names_the_frontend() {
    let err = run(&["-f", "[*]:443"]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingCertificate(ref p) if p == "[]:443"));
}

#[test]
fn test_global_default_covers_frontends() {
    let dir = tempfile::tempdir().unwrap();
    let pem = touch(dir.path(), "site.pem");

    let config = run(&["-f", "[*]:443", "-f", "[10.0.0.1]:443", &s(&pem)]).unwrap();
    assert_eq!(config.frontends.len(), 2);
    for frontend in config.frontends.iter() {
        assert_eq!(frontend.match_global_certs, Toggle::Enabled);
    }
}

#[test]
fn test_duplicate_frontends() {
    let dir = tempfile::tempdir().unwrap();
    let pem = touch(dir.path(), "site.pem");

    let err = run(&["-f", "[*]:443", "-f", "[*]:443", &s(&pem)]).unwrap_err();
    assert!(matches!(err.root_cause(), ConfigError::DuplicateFrontend(_)));
}

#[test]
fn test_inline_frontend_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let pem = touch(dir.path(), "inline.pem");

    let spec = format!("[*]:443+{}", pem.display());
    let config = run(&["-f", &spec]).unwrap();

    let frontend = config.frontends.get("[]:443").unwrap();
    assert_eq!(frontend.certs.len(), 1);
    assert!(!config.certs.has_default());
}

#[test]
fn test_pem_dir_sorted_scan() {
    let dir = tempfile::tempdir().unwrap();
    let pems = dir.path().join("pems");
    fs::create_dir(&pems).unwrap();
    for name in ["charlie.pem", "alpha.pem", "bravo.pem"] {
        touch(&pems, name);
    }

    let config = run(&["--pem-dir", &s(&pems)]).unwrap();

    assert_eq!(
        config.certs.default.as_ref().unwrap().filename,
        pems.join("alpha.pem")
    );
    let secondary: Vec<_> = config
        .certs
        .secondary
        .iter()
        .map(|c| c.filename.clone())
        .collect();
    assert_eq!(secondary, vec![pems.join("bravo.pem"), pems.join("charlie.pem")]);
}

#[test]
fn test_pem_dir_glob() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "site.pem");
    touch(dir.path(), "site.crt");

    let config = run(&["--pem-dir", &s(dir.path()), "--pem-dir-glob", "*.crt"]).unwrap();
    assert_eq!(config.certs.len(), 1);
    assert_eq!(
        config.certs.default.as_ref().unwrap().filename,
        dir.path().join("site.crt")
    );
}

#[test]
fn test_unix_socket_backend() {
    let dir = tempfile::tempdir().unwrap();
    let sock = dir.path().join("backend.sock");
    let _listener = UnixListener::bind(&sock).unwrap();

    let config = run(&["--client", "-b", &s(&sock)]).unwrap();
    assert_eq!(config.backend, Endpoint::Unix(sock));

    let plain = touch(dir.path(), "plain");
    let err = run(&["--client", "-b", &s(&plain)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotASocket);
}

#[test]
fn test_proxy_modes_are_exclusive() {
    let err = run(&["--client", "--write-ip", "--proxy-proxy"]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCombination(_)));
}

#[test]
fn test_client_verify_needs_ca() {
    let err = run(&["--client", "--client-verify=required"]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCombination(_)));

    let config = run(&[
        "--client",
        "--client-verify=optional",
        "--client-verify-ca=/etc/ssl/ca.pem",
    ])
    .unwrap();
    assert_eq!(config.client_verify.to_string(), "optional");
}

#[cfg(feature = "shared-cache")]
#[test]
fn test_shared_cache_settings() {
    let config = run(&[
        "--client",
        "-C",
        "1000",
        "-U",
        "[*]:8888",
        "-P",
        "[10.0.0.2]:8888",
        "-P",
        "[10.0.0.3]:8888",
        "-M",
        "eth0,2",
    ])
    .unwrap();

    assert!(config.shared_cache.is_enabled());
    assert_eq!(config.shared_cache.peers.len(), 2);
    assert_eq!(config.shared_cache.mcast_if.as_ref().unwrap().ttl, Some(2));

    let err = run(&["--client", "-U", "[*]:8888"]).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCombination(_)));
}

#[test]
fn test_snapshot_serializes() {
    let config = run(&["--client", "-t"]).unwrap();
    assert!(config.test_only);

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["workers"], 1);
    assert!(json.get("sources").is_none());
}
