use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use fdtable::prelude::*;

// ---------------------------------------------------------------------------
// In-process collaborators
// ---------------------------------------------------------------------------

/// Engine stand-in that accepts every request and logs it.
struct LoggingEngine;

#[async_trait]
impl GameEngine for LoggingEngine {
    async fn call(
        &self,
        route: &str,
        req: GameRequest,
    ) -> Result<GameAck, EngineError> {
        tracing::info!(route, table_id = %req.table_id, kind = req.req.kind(), "engine call");
        Ok(GameAck::ok())
    }
}

struct LoggingReporter;

#[async_trait]
impl OccupancyReporter for LoggingReporter {
    async fn report(&self, report: OccupancyReport) -> Result<(), ReportError> {
        for entry in &report.entries {
            tracing::info!(match_id = %entry.match_id, online = entry.online, "occupancy");
        }
        Ok(())
    }
}

fn mahjong() -> MatchConfig {
    MatchConfig {
        match_id: MatchId(1),
        name: "friends mahjong".into(),
        game_type: "mahjong".into(),
        player_per_table: 4,
        initial_chips: 1_000,
        score_base: 1,
        property: BTreeMap::new(),
        sign_condition: String::new(),
    }
}

fn log_pushes(who: &str, rx: &mut PushReceiver) {
    while let Ok(push) = rx.try_recv() {
        tracing::info!(player = who, push = ?push.push, "push");
    }
}

fn request(req: ClientRequest) -> MatchRequest {
    MatchRequest {
        match_id: MatchId(1),
        req,
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// Two friends open a room, play one round and finish. Returns the final
/// result pushed to the room's creator.
async fn play(
    server: &FdTableServer,
    gateway: &LocalGateway,
) -> Result<FdResult, Box<dyn std::error::Error>> {
    let dispatcher = server.dispatcher();
    let (alice, bob) = (SessionId(1), SessionId(2));
    gateway.bind(alice, Uid::from("alice"));
    gateway.bind(bob, Uid::from("bob"));
    let mut rx_alice = gateway.subscribe(Uid::from("alice"));
    let mut rx_bob = gateway.subscribe(Uid::from("bob"));

    let created = dispatcher
        .handle_client(
            alice,
            request(ClientRequest::CreateRoom(CreateRoomReq {
                game_count: 1,
                desn: "one quick round".into(),
                properties: BTreeMap::new(),
            })),
        )
        .await;
    let ClientAck::StartClient(start) = created.ack else {
        return Err(format!("create failed: {:?}", created.ack).into());
    };
    let table_id = start.table_id;
    tracing::info!(%table_id, "alice opened a room");

    let joined = dispatcher
        .handle_client(bob, request(ClientRequest::JoinRoom { table_id }))
        .await;
    tracing::info!(ack = ?joined.ack, "bob joined");

    let mut scores = BTreeMap::new();
    scores.insert(Uid::from("alice"), 24);
    scores.insert(Uid::from("bob"), -24);
    dispatcher
        .handle_remote(RemoteRequest {
            match_id: MatchId(1),
            event: EngineEvent::GameResult(GameResultUpdate {
                table_id,
                cur_game_count: 1,
                scores,
                player_data: BTreeMap::new(),
                round_data: "alice wins on a self-drawn tile".into(),
            }),
        })
        .await?;
    dispatcher
        .handle_remote(RemoteRequest {
            match_id: MatchId(1),
            event: EngineEvent::GameOver { table_id },
        })
        .await?;

    log_pushes("bob", &mut rx_bob);
    let mut last = None;
    while let Ok(push) = rx_alice.try_recv() {
        tracing::info!(player = "alice", push = ?push.push, "push");
        if let Push::MatchResult(result) = push.push {
            last = Some(result);
        }
    }
    last.ok_or_else(|| "no final result pushed".into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let gateway = Arc::new(LocalGateway::new());
    let server = FdTableServer::builder()
        .server_id("local-1")
        .match_config(mahjong())
        .build(
            Arc::new(LoggingEngine),
            gateway.clone(),
            Arc::new(MemoryBindingStore::new()),
            Arc::new(LoggingReporter),
        )?;

    let result = play(&server, &gateway).await?;
    tracing::info!(scores = ?result.scores, rounds = result.rounds.len(), "table finished");

    server.run_until(async {}).await?;
    Ok(())
}
