//! Background suggestion worker.
//!
//! `SuggestionWorker` moves an `InputSession` onto a dedicated thread.
//! Every `submit` gets a generation number; when several inputs are queued
//! only the newest is computed, and callers read the latest published result.
//! Accept/remove/clear run on the same thread, so user lexicon updates are
//! strictly sequential.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use jyutping_core::Candidate;
use tracing::{debug, warn};

use crate::session::InputSession;

/// Result published for one input generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub generation: u64,
    pub input: String,
    pub marked_text: String,
    pub candidates: Vec<Candidate>,
}

enum Request {
    Input { generation: u64, text: String },
    Accept(Candidate),
    Remove(Candidate),
    ClearUserLexicon,
    Close,
}

#[derive(Default)]
struct Latest {
    slot: Mutex<Option<Suggestion>>,
    ready: Condvar,
}

impl Latest {
    fn publish(&self, suggestion: Suggestion) {
        if let Ok(mut slot) = self.slot.lock() {
            let stale = slot
                .as_ref()
                .is_some_and(|s| s.generation > suggestion.generation);
            if !stale {
                *slot = Some(suggestion);
                self.ready.notify_all();
            }
        }
    }
}

pub struct SuggestionWorker {
    sender: Sender<Request>,
    latest: Arc<Latest>,
    generation: u64,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SuggestionWorker {
    /// Spawn the worker thread, handing it `session`.
    pub fn start(session: InputSession) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let latest = Arc::new(Latest::default());
        let published = Arc::clone(&latest);
        let join_handle = std::thread::Builder::new()
            .name("jyutping-suggest".to_owned())
            .spawn(move || run(session, receiver, published))?;
        Ok(Self {
            sender,
            latest,
            generation: 0,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    /// Queue a new buffer. Returns the generation its result will carry.
    pub fn submit(&mut self, text: &str) -> u64 {
        self.generation += 1;
        self.send(Request::Input {
            generation: self.generation,
            text: text.to_string(),
        });
        self.generation
    }

    pub fn accept(&self, candidate: Candidate) {
        self.send(Request::Accept(candidate));
    }

    pub fn remove(&self, candidate: Candidate) {
        self.send(Request::Remove(candidate));
    }

    pub fn clear_user_lexicon(&self) {
        self.send(Request::ClearUserLexicon);
    }

    fn send(&self, request: Request) {
        if self.sender.send(request).is_err() {
            warn!("suggestion worker has stopped");
        }
    }

    /// The newest result published so far, if any.
    pub fn try_latest(&self) -> Option<Suggestion> {
        self.latest.slot.lock().ok().and_then(|slot| slot.clone())
    }

    /// Wait for the result of the most recent `submit`, up to `timeout`.
    pub fn wait_latest(&self, timeout: Duration) -> Option<Suggestion> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.latest.slot.lock().ok()?;
        loop {
            if let Some(s) = slot.as_ref() {
                if s.generation >= self.generation {
                    return Some(s.clone());
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (next, _) = self.latest.ready.wait_timeout(slot, deadline - now).ok()?;
            slot = next;
        }
    }

    /// Close the session and wait for the thread to exit.
    pub fn shutdown(&self) {
        let _ = self.sender.send(Request::Close);
        let join_handle = match self.join_handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(_) => return,
        };
        if let Some(join_handle) = join_handle {
            let _ = join_handle.join();
        }
    }
}

impl Drop for SuggestionWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish(session: &InputSession, generation: u64, latest: &Latest) {
    latest.publish(Suggestion {
        generation,
        input: session.input().to_string(),
        marked_text: session.marked_text().to_string(),
        candidates: session.candidates().candidates().to_vec(),
    });
}

fn run(mut session: InputSession, receiver: Receiver<Request>, latest: Arc<Latest>) {
    debug!("suggestion worker started");
    let mut pending: Option<Request> = None;
    let mut current = 0;
    loop {
        let request = match pending.take() {
            Some(r) => r,
            None => match receiver.recv() {
                Ok(r) => r,
                Err(_) => break,
            },
        };
        match request {
            Request::Input {
                mut generation,
                mut text,
            } => {
                // Skip to the newest queued input; anything else waits its turn.
                while let Ok(next) = receiver.try_recv() {
                    match next {
                        Request::Input {
                            generation: g,
                            text: t,
                        } => {
                            debug!(superseded = generation, "dropping stale input");
                            generation = g;
                            text = t;
                        }
                        other => {
                            pending = Some(other);
                            break;
                        }
                    }
                }
                session.set_input(&text);
                current = generation;
                publish(&session, current, &latest);
            }
            Request::Accept(candidate) => {
                session.accept(&candidate);
            }
            Request::Remove(candidate) => {
                session.remove(&candidate);
                publish(&session, current, &latest);
            }
            Request::ClearUserLexicon => {
                session.clear_user_lexicon();
                publish(&session, current, &latest);
            }
            Request::Close => break,
        }
    }
    session.close();
    debug!("suggestion worker exiting");
}
