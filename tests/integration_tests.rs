use serde::Deserialize;
use std::collections::HashMap;
use stratum_client::{Client, Config, Payload, StratumError};

// These tests talk to a live Stratum server. Provide STRATUM_HOST (or
// STRATUM_BASE_URL), STRATUM_USERNAME and STRATUM_PASSWORD, then run:
// cargo test --test integration_tests -- --ignored --test-threads=1

#[derive(Debug, Deserialize)]
struct Platform {
    id: i64,
    name: String,
    #[serde(default)]
    guestos: Option<String>,
}

fn live_client() -> Client {
    let mut config = Config::from_env().expect("STRATUM_* environment");
    if config.username.is_empty() {
        config.username = "apiclienttest".to_string();
    }
    Client::connect(config).expect("failed to open client")
}

#[test]
#[ignore]
fn test_open() {
    let client = live_client();
    assert!(client.is_opened());
    assert!(!client.bearer_token().expect("bearer token").is_empty());
}

#[test]
#[ignore]
fn test_get() {
    let client = live_client();

    let platforms: Vec<Platform> = client
        .apply(
            "GET",
            "platform/?orderby=name&select=id,name&where=name~Linux",
            None,
        )
        .expect("failed to get platforms");

    assert!(platforms.len() >= 4, "get platforms count: {}", platforms.len());
    println!("Get test passed: {} platforms", platforms.len());
}

#[test]
#[ignore]
fn test_post_put_delete() {
    let client = live_client();

    let mut post = HashMap::new();
    post.insert("name", "Linux SuperCoreFlashyPlatform 1.0");

    let created: Vec<Platform> = client
        .post("platform/?returning=*", Some(Payload::json(&post).unwrap()))
        .expect("post platform")
        .apply()
        .expect("decode created platform");
    assert_eq!(created.len(), 1, "post platform count");
    let id = created[0].id;

    let mut put = HashMap::new();
    put.insert("guestos", "NOSUCHTHING");

    let updated: Vec<Platform> = client
        .put(
            &format!("platform/?returning=*&where=id={}", id),
            Some(Payload::json(&put).unwrap()),
        )
        .expect("put platform")
        .apply()
        .expect("decode updated platform");
    assert_eq!(updated.len(), 1, "put platform count");
    assert_eq!(updated[0].guestos.as_deref(), Some("NOSUCHTHING"));

    let deleted: Vec<Platform> = client
        .delete(&format!("platform/?returning=*&where=id={}", id), None)
        .expect("delete platform")
        .apply()
        .expect("decode deleted platform");
    assert_eq!(deleted.len(), 1, "delete platform count");
    assert_eq!(deleted[0].name, "Linux SuperCoreFlashyPlatform 1.0");
}

#[test]
#[ignore]
fn test_error() {
    let client = live_client();

    let result = client.get("no_such_resource/?select=*");

    match result.unwrap_err() {
        StratumError::Api(response) => {
            println!("Error test passed: {}", response);
        }
        other => panic!("expected StratumError::Api, got {:?}", other),
    }
}
