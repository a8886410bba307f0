//! Background network work. The display thread never blocks: worker
//! threads run the async client through a shared runtime and post events
//! over a channel the UI drains every frame.

use std::{
    sync::{
        mpsc,
        Arc,
        Mutex,
    },
    thread,
    time::{
        Duration,
        Instant,
    },
};

use serde_json::Value;
use tokio::runtime::Runtime;

use crate::{
    core::{
        models::SessionStatus,
        settings::DisplaySettings,
    },
    net::{
        client::http_client,
        live,
        session,
        sim::SimFeed,
        summary,
    },
    summary::FetchOutcome,
};

#[derive(Debug)]
pub enum NetEvent {
    Batch(Value),
    BatchError(String),
    Status(SessionStatus),
    StatusError(String),
    Summary { generation: u64, outcome: FetchOutcome },
}

pub struct NetWorker {
    runtime: Arc<Runtime>,
    receiver: mpsc::Receiver<NetEvent>,
    sender: mpsc::Sender<NetEvent>,
    settings: DisplaySettings,
    sim: Option<Arc<Mutex<SimFeed>>>,
    sim_epoch: Instant,
}

impl NetWorker {
    pub fn new(settings: DisplaySettings) -> Self {
        let runtime = Arc::new(Runtime::new().expect("Failed to create NetWorker runtime"));
        let (sender, receiver) = mpsc::channel();
        let sim = settings
            .simulate
            .then(|| Arc::new(Mutex::new(SimFeed::new(settings.sim_devices, 0xB0A2D))));

        Self { runtime, receiver, sender, settings, sim, sim_epoch: Instant::now() }
    }

    pub fn poll_events(&mut self) -> Vec<NetEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Spawns the long-lived ingress threads (live feed + session status,
    /// or the simulator loop).
    pub fn start(&self) {
        if let Some(sim) = &self.sim {
            self.start_sim_loop(sim.clone());
            return;
        }
        self.start_live_feed();
        self.start_status_poll();
    }

    fn start_sim_loop(&self, sim: Arc<Mutex<SimFeed>>) {
        let sender = self.sender.clone();
        let epoch = self.sim_epoch;

        thread::spawn(move || loop {
            let now_ms = epoch.elapsed().as_millis() as u64;
            let (status, batch) = match sim.lock() {
                Ok(mut feed) => feed.step(now_ms),
                Err(_) => return,
            };
            let _ = sender.send(NetEvent::Status(status));
            if let Some(payload) = batch {
                let _ = sender.send(NetEvent::Batch(payload));
            }
            thread::sleep(Duration::from_millis(1_000));
        });
    }

    fn start_live_feed(&self) {
        let sender = self.sender.clone();
        let runtime = self.runtime.clone();
        let base_url = self.settings.base_url.clone();
        let poll_ms = self.settings.live_poll_ms.max(200);
        let use_stream = self.settings.use_stream;

        thread::spawn(move || {
            let client = match http_client() {
                Ok(client) => client,
                Err(e) => {
                    let _ = sender.send(NetEvent::BatchError(e.to_string()));
                    return;
                }
            };

            loop {
                if use_stream {
                    let result = runtime.block_on(live::stream_live(&client, &base_url, |batch| {
                        let _ = sender.send(NetEvent::Batch(batch));
                    }));
                    if let Err(e) = result {
                        let _ = sender.send(NetEvent::BatchError(e.to_string()));
                    }
                    // connection ended; back off before reconnecting
                    thread::sleep(Duration::from_millis(2_000));
                } else {
                    match runtime.block_on(live::fetch_live(&client, &base_url)) {
                        Ok(payload) => {
                            let _ = sender.send(NetEvent::Batch(payload));
                        }
                        Err(e) => {
                            let _ = sender.send(NetEvent::BatchError(e.to_string()));
                        }
                    }
                    thread::sleep(Duration::from_millis(poll_ms));
                }
            }
        });
    }

    fn start_status_poll(&self) {
        let sender = self.sender.clone();
        let runtime = self.runtime.clone();
        let base_url = self.settings.base_url.clone();
        let poll_ms = self.settings.status_poll_ms.max(200);

        thread::spawn(move || {
            let client = match http_client() {
                Ok(client) => client,
                Err(e) => {
                    let _ = sender.send(NetEvent::StatusError(e.to_string()));
                    return;
                }
            };

            loop {
                match runtime.block_on(session::fetch_status(&client, &base_url)) {
                    Ok(status) => {
                        let _ = sender.send(NetEvent::Status(status));
                    }
                    Err(e) => {
                        let _ = sender.send(NetEvent::StatusError(e.to_string()));
                    }
                }
                thread::sleep(Duration::from_millis(poll_ms));
            }
        });
    }

    /// Fire-and-forget warmup request (no-op against the simulator, which
    /// materializes on its own).
    pub fn prime_summary(&self) {
        if self.sim.is_some() {
            return;
        }
        let runtime = self.runtime.clone();
        let base_url = self.settings.base_url.clone();

        thread::spawn(move || {
            if let Ok(client) = http_client() {
                runtime.block_on(summary::prime_summary(&client, &base_url));
            }
        });
    }

    /// One conditional snapshot fetch; the outcome comes back tagged with
    /// the generation so superseded cycles are discarded by the machine.
    pub fn fetch_summary(&self, validator: Option<String>, generation: u64) {
        let sender = self.sender.clone();

        if let Some(sim) = &self.sim {
            let sim = sim.clone();
            let now_ms = self.sim_epoch.elapsed().as_millis() as u64;
            thread::spawn(move || {
                let outcome = match sim.lock() {
                    Ok(feed) => feed.summary_outcome(now_ms, validator.as_deref()),
                    Err(_) => FetchOutcome::TransportError("simulator poisoned".to_string()),
                };
                let _ = sender.send(NetEvent::Summary { generation, outcome });
            });
            return;
        }

        let runtime = self.runtime.clone();
        let base_url = self.settings.base_url.clone();
        thread::spawn(move || {
            let outcome = match http_client() {
                Ok(client) => runtime
                    .block_on(summary::fetch_summary(&client, &base_url, validator.as_deref())),
                Err(e) => FetchOutcome::TransportError(e.to_string()),
            };
            let _ = sender.send(NetEvent::Summary { generation, outcome });
        });
    }
}
