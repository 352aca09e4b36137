//! Integration tests for the dispatcher and the server builder.
//!
//! These drive the server the way a transport would: typed or raw
//! requests in, acks out, pushes observed on the local gateway.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fdtable::prelude::*;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Engine that accepts everything and remembers request kinds.
#[derive(Default)]
struct AcceptingEngine {
    kinds: Mutex<Vec<&'static str>>,
}

impl AcceptingEngine {
    fn kinds(&self) -> Vec<&'static str> {
        self.kinds.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameEngine for AcceptingEngine {
    async fn call(
        &self,
        _route: &str,
        req: GameRequest,
    ) -> Result<GameAck, EngineError> {
        self.kinds.lock().unwrap().push(req.req.kind());
        Ok(GameAck::ok())
    }
}

/// Reporter that keeps every report it is given.
#[derive(Default)]
struct CollectingReporter {
    reports: Mutex<Vec<OccupancyReport>>,
}

#[async_trait]
impl OccupancyReporter for CollectingReporter {
    async fn report(&self, report: OccupancyReport) -> Result<(), ReportError> {
        self.reports.lock().unwrap().push(report);
        Ok(())
    }
}

struct Fixture {
    engine: Arc<AcceptingEngine>,
    gateway: Arc<LocalGateway>,
    bindings: Arc<MemoryBindingStore>,
    reporter: Arc<CollectingReporter>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            engine: Arc::new(AcceptingEngine::default()),
            gateway: Arc::new(LocalGateway::new()),
            bindings: Arc::new(MemoryBindingStore::new()),
            reporter: Arc::new(CollectingReporter::default()),
        }
    }

    fn build(&self, builder: FdTableServerBuilder) -> FdTableServer {
        builder
            .build(
                self.engine.clone(),
                self.gateway.clone(),
                self.bindings.clone(),
                self.reporter.clone(),
            )
            .unwrap()
    }

    fn login(&self, n: u64, uid: &str) -> (SessionId, PushReceiver) {
        let session = SessionId(n);
        self.gateway.bind(session, Uid::from(uid));
        (session, self.gateway.subscribe(Uid::from(uid)))
    }
}

fn config(match_id: i32, seats: u32) -> MatchConfig {
    MatchConfig {
        match_id: MatchId(match_id),
        name: format!("match {match_id}"),
        game_type: "mahjong".into(),
        player_per_table: seats,
        initial_chips: 500,
        score_base: 1,
        property: Default::default(),
        sign_condition: String::new(),
    }
}

fn server_with_match(fx: &Fixture, seats: u32) -> FdTableServer {
    fx.build(
        FdTableServer::builder()
            .server_id("node-7")
            .match_config(config(1, seats)),
    )
}

fn create(match_id: i32) -> MatchRequest {
    MatchRequest {
        match_id: MatchId(match_id),
        req: ClientRequest::CreateRoom(CreateRoomReq {
            game_count: 4,
            desn: "friday".into(),
            properties: BTreeMap::new(),
        }),
    }
}

fn expect_table(ack: &MatchAck) -> TableId {
    match &ack.ack {
        ClientAck::StartClient(start) => start.table_id,
        other => panic!("expected StartClient, got {other:?}"),
    }
}

fn expect_error_code(ack: &MatchAck) -> u16 {
    match &ack.ack {
        ClientAck::Error { code, .. } => *code,
        other => panic!("expected Error, got {other:?}"),
    }
}

fn drain(rx: &mut PushReceiver) -> Vec<Push> {
    let mut out = Vec::new();
    while let Ok(push) = rx.try_recv() {
        out.push(push.push);
    }
    out
}

// ---------------------------------------------------------------------------
// Dispatcher: client requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handle_client_create_then_join_same_table() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let dispatcher = server.dispatcher();
    let (alice, _rx_a) = fx.login(1, "alice");
    let (bob, _rx_b) = fx.login(2, "bob");

    let created = dispatcher.handle_client(alice, create(1)).await;
    assert_eq!(created.server_id, "node-7");
    assert_eq!(created.match_id, MatchId(1));
    let table_id = expect_table(&created);

    let joined = dispatcher
        .handle_client(
            bob,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::JoinRoom { table_id },
            },
        )
        .await;
    assert_eq!(expect_table(&joined), table_id);

    let registry = server.context().registry();
    assert_eq!(registry.load(&Uid::from("bob")).unwrap().seat, Some(1));
    assert_eq!(
        fx.bindings.get(&Uid::from("alice")),
        Some(MatchId(1))
    );
    assert_eq!(
        fx.engine.kinds(),
        vec!["AddTable", "AddPlayer", "AddPlayer"]
    );
}

#[tokio::test]
async fn test_handle_client_unknown_match_returns_error_ack() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let (alice, _rx) = fx.login(1, "alice");

    let ack = server.dispatcher().handle_client(alice, create(99)).await;

    assert_eq!(ack.match_id, MatchId(99));
    assert_eq!(expect_error_code(&ack), 1011);
    assert!(server.context().registry().is_empty());
}

#[tokio::test]
async fn test_handle_client_unbound_session_returns_not_logged_in() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);

    let ack = server
        .dispatcher()
        .handle_client(SessionId(404), create(1))
        .await;

    assert_eq!(expect_error_code(&ack), 1001);
    assert_eq!(server.context().matches().get(MatchId(1)).unwrap().table_count(), 0);
}

#[tokio::test]
async fn test_handle_client_second_create_returns_already_in_match() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let dispatcher = server.dispatcher();
    let (alice, _rx) = fx.login(1, "alice");

    expect_table(&dispatcher.handle_client(alice, create(1)).await);
    let second = dispatcher.handle_client(alice, create(1)).await;

    assert_eq!(expect_error_code(&second), 1002);
}

#[tokio::test]
async fn test_handle_client_exit_and_fd_result() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let dispatcher = server.dispatcher();
    let (alice, _rx_a) = fx.login(1, "alice");
    let (bob, _rx_b) = fx.login(2, "bob");

    let table_id = expect_table(&dispatcher.handle_client(alice, create(1)).await);
    dispatcher
        .handle_client(
            bob,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::JoinRoom { table_id },
            },
        )
        .await;

    let result = dispatcher
        .handle_client(
            alice,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::FdResult,
            },
        )
        .await;
    match result.ack {
        ClientAck::FdResult(fd) => {
            assert_eq!(fd.table_id, table_id);
            assert_eq!(fd.owner, Some(Uid::from("alice")));
            assert_eq!(fd.desn, "friday");
        }
        other => panic!("expected FdResult, got {other:?}"),
    }

    let exit = dispatcher
        .handle_client(
            bob,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::ExitMatch,
            },
        )
        .await;
    assert_eq!(exit.ack, ClientAck::ExitMatch);
    assert!(server.context().registry().load(&Uid::from("bob")).is_none());
}

#[tokio::test]
async fn test_handle_client_cancel_room_ends_table() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let dispatcher = server.dispatcher();
    let (alice, mut rx) = fx.login(1, "alice");

    let table_id = expect_table(&dispatcher.handle_client(alice, create(1)).await);
    let ack = dispatcher
        .handle_client(
            alice,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::CancelRoom { table_id },
            },
        )
        .await;

    assert_eq!(ack.ack, ClientAck::CancelRoom { table_id });
    assert!(server.context().registry().is_empty());
    let pushes = drain(&mut rx);
    assert!(matches!(pushes.last(), Some(Push::MatchResult(_))));
}

// ---------------------------------------------------------------------------
// Dispatcher: raw bytes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handle_client_bytes_round_trip() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);
    let (alice, _rx) = fx.login(1, "alice");

    let raw = br#"{"match_id":1,"req":{"type":"CreateRoom","game_count":2}}"#;
    let out = server
        .dispatcher()
        .handle_client_bytes(alice, raw)
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["server_id"], "node-7");
    assert_eq!(value["match_id"], 1);
    assert_eq!(value["ack"]["type"], "StartClient");
    assert_eq!(value["ack"]["match_type"], "fdtable");
}

#[tokio::test]
async fn test_handle_client_bytes_garbage_returns_protocol_error_ack() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);

    let out = server
        .dispatcher()
        .handle_client_bytes(SessionId(1), b"not json")
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["match_id"], 0);
    assert_eq!(value["ack"]["type"], "Error");
    assert_eq!(value["ack"]["code"], 1000);
}

// ---------------------------------------------------------------------------
// Dispatcher: engine/proxy events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handle_remote_game_result_then_game_over() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 2);
    let dispatcher = server.dispatcher();
    let (alice, mut rx_a) = fx.login(1, "alice");
    let (bob, mut rx_b) = fx.login(2, "bob");

    let table_id = expect_table(&dispatcher.handle_client(alice, create(1)).await);
    dispatcher
        .handle_client(
            bob,
            MatchRequest {
                match_id: MatchId(1),
                req: ClientRequest::JoinRoom { table_id },
            },
        )
        .await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    let mut scores = BTreeMap::new();
    scores.insert(Uid::from("alice"), 30);
    scores.insert(Uid::from("bob"), -30);
    dispatcher
        .handle_remote(RemoteRequest {
            match_id: MatchId(1),
            event: EngineEvent::GameResult(GameResultUpdate {
                table_id,
                cur_game_count: 1,
                scores,
                player_data: BTreeMap::new(),
                round_data: String::new(),
            }),
        })
        .await
        .unwrap();

    match drain(&mut rx_b).as_slice() {
        [Push::RoundResult(round)] => {
            assert_eq!(round.scores[&Uid::from("bob")], -30);
        }
        other => panic!("expected one RoundResult, got {other:?}"),
    }

    let raw = format!(
        r#"{{"match_id":1,"event":{{"type":"GameOver","table_id":{}}}}}"#,
        table_id.0
    );
    dispatcher.handle_remote_bytes(raw.as_bytes()).await.unwrap();

    match drain(&mut rx_a).as_slice() {
        [_, Push::MatchResult(result)] => {
            assert_eq!(result.scores[&Uid::from("alice")], 30);
        }
        other => panic!("expected RoundResult then MatchResult, got {other:?}"),
    }
    assert!(server.context().registry().is_empty());
    assert!(fx.bindings.is_empty());

    // A repeated GameOver finds nothing.
    let again = dispatcher.handle_remote_bytes(raw.as_bytes()).await;
    assert!(matches!(
        again,
        Err(FdTableError::Match(MatchError::TableNotFound(_)))
    ));
}

#[tokio::test]
async fn test_handle_remote_unknown_match_errors() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);

    let err = server
        .dispatcher()
        .handle_remote(RemoteRequest {
            match_id: MatchId(5),
            event: EngineEvent::NetState {
                uid: Uid::from("ghost"),
                online: false,
            },
        })
        .await
        .unwrap_err();

    assert!(matches!(err, FdTableError::MatchNotFound(MatchId(5))));
    assert_eq!(err.code(), 1011);
}

#[tokio::test]
async fn test_handle_remote_bytes_garbage_is_protocol_error() {
    let fx = Fixture::new();
    let server = server_with_match(&fx, 4);

    let err = server
        .dispatcher()
        .handle_remote_bytes(b"{")
        .await
        .unwrap_err();

    assert!(matches!(err, FdTableError::Protocol(_)));
}

// ---------------------------------------------------------------------------
// Builder and run loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_builder_loads_config_dir_and_inline_configs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("m2.json"),
        serde_json::to_string(&config(2, 4)).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();

    let fx = Fixture::new();
    let server = fx.build(
        FdTableServer::builder()
            .config_dir(dir.path())
            .match_config(config(1, 2)),
    );

    assert_eq!(
        server.context().matches().match_ids(),
        vec![MatchId(1), MatchId(2)]
    );
    assert_eq!(server.context().server_id(), "fdtable-1");
}

#[tokio::test]
async fn test_builder_duplicate_inline_config_fails() {
    let fx = Fixture::new();
    let result = FdTableServer::builder()
        .match_config(config(1, 2))
        .match_config(config(1, 4))
        .build(
            fx.engine.clone(),
            fx.gateway.clone(),
            fx.bindings.clone(),
            fx.reporter.clone(),
        );

    assert!(matches!(result, Err(FdTableError::Config(_))));
}

#[tokio::test]
async fn test_builder_missing_config_dir_fails() {
    let fx = Fixture::new();
    let result = FdTableServer::builder()
        .config_dir("/definitely/not/here")
        .build(
            fx.engine.clone(),
            fx.gateway.clone(),
            fx.bindings.clone(),
            fx.reporter.clone(),
        );

    assert!(matches!(result, Err(FdTableError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_run_until_reports_and_stops_tables() {
    let fx = Fixture::new();
    let server = fx.build(
        FdTableServer::builder()
            .report_interval(Duration::from_secs(40))
            .match_config(config(1, 4)),
    );
    let dispatcher = server.dispatcher();
    let (alice, _rx) = fx.login(1, "alice");
    let table_id = expect_table(&dispatcher.handle_client(alice, create(1)).await);

    let matches = Arc::clone(server.context().matches());
    server
        .run_until(tokio::time::sleep(Duration::from_secs(50)))
        .await
        .unwrap();

    let reports = fx.reporter.reports.lock().unwrap().clone();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].entries[0].match_id, MatchId(1));
    assert_eq!(reports[0].entries[0].server_id, "fdtable-1");

    let m = matches.get(MatchId(1)).unwrap();
    assert_eq!(m.table_count(), 0);
    assert!(m.table(table_id).is_none());
}
