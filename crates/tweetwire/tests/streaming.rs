//! Streaming integration tests: client, classifier and both processors
//! against a `wiremock` server serving a finite newline-delimited body.

use async_trait::async_trait;
use tweetwire::{
    BufferedStreamProcessor, CallArgs, ConsumerState, DeletionNotice, DisconnectNotice,
    FriendsList, ProducerHalt, Status, StreamEnd, StreamProcessor, TwitterClient, TwitterConfig,
    TwitterError, UserEvent,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

// ============================================================================
// Test Utilities
// ============================================================================

fn test_config(mock_server: &MockServer) -> TwitterConfig {
    TwitterConfig {
        host_override: Some(mock_server.address().to_string()),
        secure: false,
        load_user: false,
        ..TwitterConfig::new("test_consumer_key", "test_consumer_secret")
            .with_access_token("test_access_token", "test_access_token_secret")
    }
}

const USER_STREAM_BODY: &str = concat!(
    "{\"friends\":[1,2,3]}\r\n",
    "\r\n",
    "{\"id\":10,\"text\":\"first\"}\r\n",
    "{\"event\":\"favorite\",\"source\":{\"id\":1},\"target\":{\"id\":2},",
    "\"target_object\":{\"id\":10,\"text\":\"first\"}}\r\n",
    "not json at all\r\n",
    "{\"delete\":{\"status\":{\"id\":10,\"user_id\":2}}}\r\n",
    "{\"id\":11,\"text\":\"second\"}\r\n",
    "{\"disconnect\":{\"code\":4,\"stream_name\":\"pony-main\",\"reason\":\"duplicate\"}}\r\n",
);

#[derive(Default)]
struct Journal {
    entries: Vec<String>,
    stop_on_delete: bool,
}

#[async_trait]
impl StreamProcessor for Journal {
    async fn on_status(&mut self, status: Status) -> bool {
        self.entries.push(format!("status:{}", status.id));
        true
    }

    async fn on_event(&mut self, event: UserEvent) -> bool {
        self.entries.push(format!("event:{}", event.event));
        true
    }

    async fn on_delete(&mut self, notice: DeletionNotice) -> bool {
        self.entries.push(format!("delete:{}", notice.status.map_or(0, |s| s.id)));
        !self.stop_on_delete
    }

    async fn on_disconnect(&mut self, notice: DisconnectNotice) -> bool {
        self.entries.push(format!("disconnect:{}", notice.code));
        true
    }

    async fn on_friends(&mut self, friends: FriendsList) -> bool {
        self.entries.push(format!("friends:{}", friends.ids.len()));
        true
    }
}

async fn mount_user_stream(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/1.1/user.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(USER_STREAM_BODY))
        .mount(mock_server)
        .await;
}

// ============================================================================
// Inline
// ============================================================================

#[tokio::test]
async fn inline_stream_dispatches_in_order() {
    let mock_server = MockServer::start().await;
    mount_user_stream(&mock_server).await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let mut journal = Journal::default();
    let outcome = client
        .stream("user_stream", CallArgs::new(), &mut journal)
        .await
        .unwrap();

    assert_eq!(outcome.end, StreamEnd::Closed);
    assert_eq!(
        journal.entries,
        vec![
            "friends:3",
            "status:10",
            "event:favorite",
            "delete:10",
            "status:11",
            "disconnect:4",
        ]
    );
}

#[tokio::test]
async fn inline_stream_stops_on_false() {
    let mock_server = MockServer::start().await;
    mount_user_stream(&mock_server).await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let mut journal = Journal {
        stop_on_delete: true,
        ..Journal::default()
    };
    let outcome = client
        .stream("user_stream", CallArgs::new(), &mut journal)
        .await
        .unwrap();

    assert_eq!(outcome.end, StreamEnd::Stopped);
    assert_eq!(journal.entries.last().map(String::as_str), Some("delete:10"));
}

#[tokio::test]
async fn filter_stream_posts_track() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/1.1/statuses/filter.json"))
        .and(body_string_contains("track=rust%2Ctokio"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("{\"id\":1,\"text\":\"rust\"}\r\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let mut journal = Journal::default();
    client
        .stream(
            "filter_stream",
            CallArgs::new().param("track", vec!["rust", "tokio"]),
            &mut journal,
        )
        .await
        .unwrap();

    assert_eq!(journal.entries, vec!["status:1"]);
}

#[tokio::test]
async fn stream_rejection_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.1/statuses/sample.json"))
        .respond_with(ResponseTemplate::new(420).set_body_string("Enhance Your Calm"))
        .mount(&mock_server)
        .await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let mut journal = Journal::default();
    let err = client
        .stream("sample_stream", CallArgs::new(), &mut journal)
        .await
        .unwrap_err();

    assert!(matches!(err, TwitterError::Api { code: Some(420), .. }));
    assert!(journal.entries.is_empty());
}

// ============================================================================
// Buffered
// ============================================================================

#[tokio::test]
async fn buffered_stream_drains_everything() {
    let mock_server = MockServer::start().await;
    mount_user_stream(&mock_server).await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let outcome = client
        .stream_buffered("user_stream", CallArgs::new(), Journal::default())
        .await
        .unwrap();

    assert_eq!(outcome.halt, ProducerHalt::StreamClosed);
    assert_eq!(outcome.consumer, ConsumerState::Finished);
    assert_eq!(outcome.dispatched, 6);
    assert_eq!(outcome.processor.entries.first().map(String::as_str), Some("friends:3"));
}

#[tokio::test]
async fn buffered_stream_small_queue_halts_producer() {
    let mock_server = MockServer::start().await;
    mount_user_stream(&mock_server).await;

    let client = TwitterClient::new(test_config(&mock_server)).unwrap();
    let mut reader = client
        .open_stream("user_stream", CallArgs::new())
        .await
        .unwrap();

    let outcome = BufferedStreamProcessor::with_capacity(Journal::default(), 2)
        .run(&mut reader)
        .await
        .unwrap();

    assert_eq!(outcome.halt, ProducerHalt::QueueFull);
    assert!(outcome.dispatched < 6, "rest of the stream must be dropped");
    assert_eq!(outcome.processor.entries[..2], ["friends:3", "status:10"]);
}
