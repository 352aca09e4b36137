//! Shared fakes for the match integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fdtable_match::{EngineError, GameEngine, Match, MatchConfig, Services};
use fdtable_protocol::{GameAck, GameRequest, MatchId, MatchPush, Push, SessionId, Uid};
use fdtable_session::{
    BindingError, BindingStore, LocalGateway, MemoryBindingStore, PushReceiver,
};

/// Engine fake: records every request and rejects the kinds it is told
/// to, optionally after a delay.
#[derive(Default)]
pub struct ScriptedEngine {
    calls: Mutex<Vec<GameRequest>>,
    failing: Mutex<HashSet<&'static str>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedEngine {
    /// Makes every following call take `delay` before answering.
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn speed_up(&self) {
        *self.delay.lock().unwrap() = None;
    }

    pub fn fail_on(&self, kind: &'static str) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn recover(&self, kind: &'static str) {
        self.failing.lock().unwrap().remove(kind);
    }

    /// Request kinds in call order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|r| r.req.kind()).collect()
    }

    pub fn calls(&self) -> Vec<GameRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameEngine for ScriptedEngine {
    async fn call(
        &self,
        _route: &str,
        req: GameRequest,
    ) -> Result<GameAck, EngineError> {
        let kind = req.req.kind();
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(req);
        if self.failing.lock().unwrap().contains(kind) {
            return Err(EngineError::Transport(format!("scripted {kind} failure")));
        }
        Ok(GameAck::ok())
    }
}

/// Binding store whose writes always fail.
pub struct FailingBindings;

#[async_trait]
impl BindingStore for FailingBindings {
    async fn put(&self, _uid: &Uid, _match_id: MatchId) -> Result<(), BindingError> {
        Err(BindingError::Unavailable("store offline".into()))
    }

    async fn remove(&self, _uid: &Uid) -> Result<(), BindingError> {
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub gateway: Arc<LocalGateway>,
    pub bindings: Arc<MemoryBindingStore>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let engine = Arc::new(ScriptedEngine::default());
        let gateway = Arc::new(LocalGateway::new());
        let bindings = Arc::new(MemoryBindingStore::new());
        let services = Services::new(
            "fdtable-test",
            engine.clone(),
            gateway.clone(),
            bindings.clone(),
        );
        Self {
            engine,
            gateway,
            bindings,
            services,
        }
    }

    /// Binds `uid` to session `n` and opens its push channel.
    pub fn login(&self, n: u64, uid: &str) -> (SessionId, PushReceiver) {
        let session = SessionId(n);
        self.gateway.bind(session, Uid::from(uid));
        (session, self.gateway.subscribe(Uid::from(uid)))
    }

    pub fn build(&self, config: MatchConfig) -> Match {
        Match::new(config, self.services.clone()).unwrap()
    }
}

pub fn config(match_id: i32, seats: u32) -> MatchConfig {
    MatchConfig {
        match_id: MatchId(match_id),
        name: format!("match {match_id}"),
        game_type: "mahjong".into(),
        player_per_table: seats,
        initial_chips: 1_000,
        score_base: 1,
        property: Default::default(),
        sign_condition: String::new(),
    }
}

pub fn uid(s: &str) -> Uid {
    Uid::from(s)
}

/// Everything currently waiting on a push channel.
pub fn drain(rx: &mut PushReceiver) -> Vec<MatchPush> {
    let mut out = Vec::new();
    while let Ok(push) = rx.try_recv() {
        out.push(push);
    }
    out
}

/// Only the payloads, for terse assertions.
pub fn drain_pushes(rx: &mut PushReceiver) -> Vec<Push> {
    drain(rx).into_iter().map(|p| p.push).collect()
}
