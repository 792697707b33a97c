/*
    Hash Anchoring Integration Tests

    Drives the dispatcher the way a host would: one invocation per call,
    caller identity supplied by the execution context, shared state across
    callers. Covers:
    - submit then query in key order
    - idempotent overwrite
    - isolation between senders
    - caller error and system error envelopes
    - scan handles released on every path
*/

use integrity_core::host::{Invocation, MemoryHost};
use integrity_core::{Dispatcher, HashRecord, Response, SenderToken};

fn submit(host: &MemoryHost, identity: &[u8], args: [&str; 3]) -> Response {
    let ctx = host
        .with_caller(identity.to_vec())
        .invoking(Invocation::new("submitHash", args));
    Dispatcher::default().invoke(&ctx)
}

fn query(host: &MemoryHost, sender: &str) -> Response {
    let ctx = host
        .without_caller()
        .invoking(Invocation::new("queryHash", [sender]));
    Dispatcher::default().invoke(&ctx)
}

fn records(response: &Response) -> Vec<HashRecord> {
    serde_json::from_slice(response.payload().expect("query payload")).unwrap()
}

/// **End-to-End: one sender anchors a batch and reads it back**
///
/// Scenario:
/// 1. Sender X submits ("batch1","0","abc123") and ("batch1","1","def456")
/// 2. queryHash(X) returns both records in key order
/// 3. submitHash with one argument fails as wrong format
/// 4. queryHash for an unknown sender fails as no such sender
#[test]
fn test_submit_and_query_batch() {
    let host = MemoryHost::new();
    let x = SenderToken::bind(b"x509::CN=sender-x").into_string();

    assert!(submit(&host, b"x509::CN=sender-x", ["batch1", "0", "abc123"]).is_success());
    assert!(submit(&host, b"x509::CN=sender-x", ["batch1", "1", "def456"]).is_success());

    let response = query(&host, &x);
    assert_eq!(
        records(&response),
        vec![
            HashRecord::new(x.clone(), "batch1", "0", "abc123"),
            HashRecord::new(x.clone(), "batch1", "1", "def456"),
        ]
    );

    let ctx = host
        .with_caller(b"x509::CN=sender-x".to_vec())
        .invoking(Invocation::new("submitHash", ["b"]));
    let malformed = Dispatcher::default().invoke(&ctx);
    assert_eq!(malformed.envelope().map(|e| e.code), Some(301));
    assert_eq!(host.len(), 2);

    let missing = query(&host, "Y");
    assert_eq!(missing.error(), Some("No variable by the name Y exists"));
    assert_eq!(host.open_scans(), 0);
}

#[test]
fn test_resubmit_overwrites_hash() {
    let host = MemoryHost::new();
    let sender = SenderToken::bind(b"alice").into_string();

    submit(&host, b"alice", ["docs", "4", "old"]);
    submit(&host, b"alice", ["docs", "4", "new"]);

    let listed = records(&query(&host, &sender));
    assert_eq!(listed, vec![HashRecord::new(sender, "docs", "4", "new")]);
    assert_eq!(host.len(), 1);
}

#[test]
fn test_senders_are_isolated() {
    let host = MemoryHost::new();
    let alice = SenderToken::bind(b"alice").into_string();
    let bob = SenderToken::bind(b"bob").into_string();

    submit(&host, b"alice", ["shared", "0", "from-alice"]);
    submit(&host, b"bob", ["shared", "0", "from-bob"]);

    let a = records(&query(&host, &alice));
    let b = records(&query(&host, &bob));

    assert_eq!(a.len(), 1);
    assert_eq!(a[0].hash, "from-alice");
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].hash, "from-bob");
}

#[test]
fn test_sender_token_that_prefixes_another() {
    let host = MemoryHost::new();
    // hex("a") = "61" is a string prefix of hex("ab") = "6162"
    let short = SenderToken::bind(b"a").into_string();
    let long = SenderToken::bind(b"ab").into_string();
    assert!(long.starts_with(&short));

    submit(&host, b"a", ["x", "0", "short"]);
    submit(&host, b"ab", ["x", "0", "long"]);

    let listed = records(&query(&host, &short));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].hash, "short");
}

#[test]
fn test_delimiter_bytes_in_arguments() {
    let host = MemoryHost::new();
    let sender = SenderToken::bind(b"alice").into_string();

    submit(&host, b"alice", ["a\u{0}b", "\u{1}", "h1"]);
    submit(&host, b"alice", ["a", "\u{0}b", "h2"]);

    let listed = records(&query(&host, &sender));
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|r| r.bucket == "a\u{0}b" && r.index == "\u{1}"));
    assert!(listed.iter().any(|r| r.bucket == "a" && r.index == "\u{0}b"));
}

#[test]
fn test_submit_without_identity_is_system_error() {
    let host = MemoryHost::new().invoking(Invocation::new("submitHash", ["b", "0", "h"]));

    let response = Dispatcher::default().invoke(&host);
    let envelope = response.envelope().unwrap();
    assert_eq!(envelope.code, 300);
    assert!(envelope.reason.starts_with("system error:"));
    assert!(host.is_empty());
}

#[test]
fn test_unknown_and_malformed_calls_share_envelope() {
    let host = MemoryHost::new().with_caller(b"alice".to_vec());
    let dispatcher = Dispatcher::default();

    let unknown = dispatcher.invoke(&host.clone().invoking(Invocation::new("deleteHash", ["x"])));
    let malformed = dispatcher.invoke(&host.clone().invoking(Invocation::new("queryHash", ["a", "b"])));

    assert_eq!(unknown.error(), malformed.error());
    assert_eq!(unknown.error(), Some(r#"{"code":301,"reason":"command format is wrong"}"#));
}

#[test]
fn test_mid_scan_failure_releases_scan() {
    let host = MemoryHost::new();
    let sender = SenderToken::bind(b"alice").into_string();
    for i in 0..5 {
        submit(&host, b"alice", ["b", &i.to_string(), "h"]);
    }

    let failing = host
        .without_caller()
        .fail_scan_after(3)
        .invoking(Invocation::new("queryHash", [sender.as_str()]));
    let response = Dispatcher::default().invoke(&failing);

    assert_eq!(response.error(), Some("storage error: scan interrupted"));
    assert!(response.payload().is_none());
    assert_eq!(host.open_scans(), 0);
}
