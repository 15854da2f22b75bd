//! End-to-end matching behavior: stub mapping JSON in, match decision out.

use mirage_matcher::{
    CompiledRequestPattern, ExclusionRules, LoggedRequest, MalformedBodyPolicy, MatchContext,
    MatcherConfig, PatternError, RequestMethod, RequestPattern, ValuePattern,
};
use std::fs;
use std::sync::Arc;

fn context_with(nodes: &[&str]) -> MatchContext {
    MatchContext::new(Arc::new(ExclusionRules::from_nodes(nodes.iter().copied())))
}

fn compile_json(json: &str, context: &MatchContext) -> CompiledRequestPattern {
    RequestPattern::from_json(json)
        .unwrap()
        .compile(context)
        .unwrap()
}

fn get(url: &str) -> LoggedRequest {
    LoggedRequest::new(RequestMethod::Get, url)
}

#[test]
fn test_every_pair_of_url_selectors_is_rejected() {
    let selectors = [
        ("url", "/a"),
        ("urlPattern", "/a.*"),
        ("urlPath", "/a"),
        ("urlPathPattern", "/a"),
    ];

    for (i, (first, first_value)) in selectors.iter().enumerate() {
        for (second, second_value) in selectors.iter().skip(i + 1) {
            let json = format!(
                r#"{{"method": "GET", "{first}": "{first_value}", "{second}": "{second_value}"}}"#
            );
            assert!(
                RequestPattern::from_json(&json).is_err(),
                "{first} + {second} should be rejected"
            );
        }
    }

    let mut pattern = RequestPattern::new(RequestMethod::Get);
    pattern.set_url_path("/a").unwrap();
    assert!(matches!(
        pattern.set_url("/a"),
        Err(PatternError::MultipleUrlSelectors)
    ));
    assert!(matches!(
        pattern.set_url_pattern("/a"),
        Err(PatternError::MultipleUrlSelectors)
    ));
    assert!(matches!(
        pattern.set_url_path_pattern("/a"),
        Err(PatternError::MultipleUrlSelectors)
    ));
    assert_eq!(pattern.url_path(), Some("/a"));
}

#[test]
fn test_url_equal_to_is_exact() {
    let compiled = compile_json(r#"{"method": "GET", "url": "/a"}"#, &context_with(&[]));

    assert!(compiled.is_matched_by(&get("/a")));
    assert!(!compiled.is_matched_by(&get("/a/")));
    assert!(!compiled.is_matched_by(&get("/ab")));
    assert!(!compiled.is_matched_by(&get("/")));
}

#[test]
fn test_url_path_is_a_raw_string_prefix() {
    let compiled = compile_json(r#"{"method": "GET", "urlPath": "/a"}"#, &context_with(&[]));

    assert!(compiled.is_matched_by(&get("/a")));
    assert!(compiled.is_matched_by(&get("/a/b")));
    assert!(compiled.is_matched_by(&get("/ax")));
    assert!(!compiled.is_matched_by(&get("/b/a")));
}

#[test]
fn test_any_method_with_url_path() {
    let compiled = compile_json(
        r#"{"method": "ANY", "urlPath": "/orders"}"#,
        &context_with(&[]),
    );

    for method in [
        RequestMethod::Get,
        RequestMethod::Post,
        RequestMethod::Put,
        RequestMethod::Delete,
        RequestMethod::Patch,
        RequestMethod::Options,
        RequestMethod::Head,
        RequestMethod::Trace,
    ] {
        assert!(compiled.is_matched_by(&LoggedRequest::new(method, "/orders")));
        assert!(compiled.is_matched_by(&LoggedRequest::new(method, "/orders/7?x=1")));
        assert!(!compiled.is_matched_by(&LoggedRequest::new(method, "/order")));
        assert!(!compiled.is_matched_by(&LoggedRequest::new(method, "/api/orders")));
    }
}

#[test]
fn test_required_absent_header_rejects_any_value() {
    let compiled = compile_json(
        r#"{"method": "ANY", "urlPath": "/", "headers": {"X-Debug": {"absent": true}}}"#,
        &context_with(&[]),
    );

    assert!(compiled.is_matched_by(&get("/x")));
    assert!(!compiled.is_matched_by(&get("/x").with_header("X-Debug", "")));
    assert!(!compiled.is_matched_by(&get("/x").with_header("x-debug", "anything")));
}

#[test]
fn test_all_absent_header_patterns_match_trivially() {
    let compiled = compile_json(
        r#"{
            "method": "GET",
            "headers": {"X-Debug": {"absent": true}, "X-Trace": {"absent": true}}
        }"#,
        &context_with(&[]),
    );

    assert!(compiled.is_matched_by(&get("/anything").with_header("Accept", "text/xml")));
}

#[test]
fn test_mixed_header_patterns() {
    let compiled = compile_json(
        r#"{
            "method": "POST",
            "url": "/ws",
            "headers": {
                "Content-Type": {"matches": "text/xml.*"},
                "X-Debug": {"absent": true}
            }
        }"#,
        &context_with(&[]),
    );
    let post = || LoggedRequest::new(RequestMethod::Post, "/ws");

    assert!(compiled.is_matched_by(&post().with_header("Content-Type", "text/xml; charset=UTF-8")));
    assert!(!compiled.is_matched_by(&post().with_header("Content-Type", "application/json")));
    assert!(!compiled.is_matched_by(
        &post()
            .with_header("Content-Type", "text/xml")
            .with_header("X-Debug", "1")
    ));
}

#[test]
fn test_query_parameters_are_decoded() {
    let compiled = compile_json(
        r#"{"method": "GET", "urlPath": "/search", "queryParameters": {"q": {"equalTo": "a b"}}}"#,
        &context_with(&[]),
    );

    assert!(compiled.is_matched_by(&get("/search?q=a%20b")));
    assert!(!compiled.is_matched_by(&get("/search?q=ab")));
    assert!(!compiled.is_matched_by(&get("/search")));
}

#[test]
fn test_excluded_nodes_ignored_in_body_comparison() {
    let compiled = compile_json(
        r#"{
            "method": "POST",
            "url": "/ws/orders",
            "bodyPatterns": [{"equalTo": "<op><arg0><id>7</id><timestamp>2020-01-01T00:00:00</timestamp></arg0></op>"}]
        }"#,
        &context_with(&["timestamp"]),
    );
    let post = |body: &str| LoggedRequest::new(RequestMethod::Post, "/ws/orders").with_body(body);

    assert!(compiled.is_matched_by(&post(
        "<op><arg0><id>7</id><timestamp>2024-06-30T12:34:56</timestamp></arg0></op>"
    )));
    assert!(!compiled.is_matched_by(&post(
        "<op><arg0><id>8</id><timestamp>2020-01-01T00:00:00</timestamp></arg0></op>"
    )));
}

#[test]
fn test_transaction_relations_ignored_in_body_comparison() {
    let compiled = compile_json(
        r#"{
            "method": "POST",
            "url": "/ws",
            "bodyPatterns": [{"equalTo": "<op><arg0><lstTransaction><amount>1</amount><relationTRX>A</relationTRX></lstTransaction><lstTransaction><amount>2</amount><relationTRX>B</relationTRX></lstTransaction></arg0></op>"}]
        }"#,
        &context_with(&[]),
    );

    let request = LoggedRequest::new(RequestMethod::Post, "/ws").with_body(
        "<op><arg0><lstTransaction><amount>1</amount><relationTRX>X</relationTRX></lstTransaction><lstTransaction><amount>2</amount><relationTRX>Y</relationTRX></lstTransaction></arg0></op>",
    );
    assert!(compiled.is_matched_by(&request));
}

#[test]
fn test_body_pattern_without_equal_to_never_matches() {
    let body = "<op><arg0><id>7</id></arg0></op>";
    let compiled = RequestPattern::for_url(RequestMethod::Post, "/ws")
        .with_body(ValuePattern::containing(body))
        .compile(&context_with(&[]))
        .unwrap();

    assert!(!compiled.is_matched_by(&LoggedRequest::new(RequestMethod::Post, "/ws").with_body(body)));
}

#[test]
fn test_no_state_leaks_between_evaluations() {
    let pattern = RequestPattern::for_url(RequestMethod::Post, "/ws").with_body(
        ValuePattern::equal_to("<op><arg0><id>1</id><timestamp>T</timestamp></arg0></op>"),
    );
    let before = pattern.clone();
    let compiled = pattern.compile(&context_with(&["timestamp"])).unwrap();

    let matching = LoggedRequest::new(RequestMethod::Post, "/ws")
        .with_body("<op><arg0><id>1</id><timestamp>U</timestamp></arg0></op>");
    let other = LoggedRequest::new(RequestMethod::Post, "/ws")
        .with_body("<op><arg0><id>2</id><timestamp>T</timestamp></arg0></op>");

    assert!(compiled.is_matched_by(&matching));
    assert!(!compiled.is_matched_by(&other));
    assert!(compiled.is_matched_by(&matching));
    assert_eq!(pattern, before);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let compiled = &compiled;
                let request = if i % 2 == 0 { &matching } else { &other };
                scope.spawn(move || {
                    (0..50).all(|_| compiled.is_matched_by(request) == (i % 2 == 0))
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}

#[test]
fn test_malformed_body_policies() {
    let pattern = RequestPattern::for_url(RequestMethod::Post, "/ws")
        .with_body(ValuePattern::equal_to("plain text"));
    let request = LoggedRequest::new(RequestMethod::Post, "/ws").with_body("plain text");

    let raw = pattern.compile(&context_with(&[])).unwrap();
    assert!(raw.is_matched_by(&request));

    let reject = pattern
        .compile(&context_with(&[]).with_malformed_body_policy(MalformedBodyPolicy::Reject))
        .unwrap();
    assert!(!reject.is_matched_by(&request));
}

#[test]
fn test_stub_tree_with_bootstrapped_excludes() {
    let root = tempfile::tempdir().unwrap();
    let config = MatcherConfig {
        root_dir: root.path().to_path_buf(),
        ..MatcherConfig::default()
    };

    let context = config.match_context();
    assert!(root.path().join("__excludes").join("exclude.json").exists());
    assert_eq!(context.exclusions().to_string(), "[dateAndTime][ipAddress]");

    let compiled = compile_json(
        r#"{
            "method": "POST",
            "url": "/ws",
            "bodyPatterns": [{"equalTo": "<op><arg0><dateAndTime>1</dateAndTime><ipAddress>a</ipAddress><id>9</id></arg0></op>"}]
        }"#,
        &context,
    );

    let request = LoggedRequest::new(RequestMethod::Post, "/ws").with_body(
        "<op><arg0><dateAndTime>2</dateAndTime><ipAddress>b</ipAddress><id>9</id></arg0></op>",
    );
    assert!(compiled.is_matched_by(&request));
}

#[test]
fn test_excludes_from_several_files_are_unioned() {
    let root = tempfile::tempdir().unwrap();
    let excludes = root.path().join("__excludes");
    fs::create_dir_all(excludes.join("team-b")).unwrap();
    fs::write(excludes.join("a.json"), r#"{"excludeNodes": ["sequential"]}"#).unwrap();
    fs::write(
        excludes.join("team-b").join("b.json"),
        r#"{"excludeNodes": ["transactionID"]}"#,
    )
    .unwrap();

    let rules = ExclusionRules::load_from_root(root.path());
    assert!(rules.contains("sequential"));
    assert!(rules.contains("transactionID"));
    assert!(!rules.contains("dateAndTime"));
}

#[test]
fn test_recorded_request_json() {
    let request = LoggedRequest::from_json(
        r#"{
            "url": "/ws?lang=en",
            "method": "POST",
            "headers": {"Content-Type": "text/xml", "Accept": ["a", "b"]},
            "body": "<op><arg0/></op>"
        }"#,
    )
    .unwrap();

    let compiled = compile_json(
        r#"{
            "method": "POST",
            "urlPath": "/ws",
            "headers": {"Accept": {"equalTo": "b"}},
            "queryParameters": {"lang": {"equalTo": "en"}},
            "bodyPatterns": [{"equalTo": "<op><arg0/></op>"}]
        }"#,
        &context_with(&[]),
    );
    assert!(compiled.is_matched_by(&request));
}
