//! Line-delimited JSON protocol spoken with a host application over stdio.
//!
//! Requests are `{"id", "cmd", "payload"}`. Translation commands run on a job
//! thread and stream `{"id", "event": "progress", ...}` lines until their final
//! reply; `cancel`, `pause` and `resume` are answered while a job is running.

use std::io::{BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use serde_json::{json, Value};

use crate::engine::Engine;
use crate::services::control::{JobControl, Progress, Reporter, RunContext};

mod command;
mod handlers;
use command::Command;

/// Where reply lines go. Shared between the reader and the job thread.
pub type Sink = Arc<Mutex<dyn Write + Send>>;

fn get_cmd(req: &Value) -> &str {
    req.get("cmd").and_then(|v| v.as_str()).unwrap_or("")
}

fn get_id(req: &Value) -> Value {
    req.get("id").cloned().unwrap_or(Value::Null)
}

fn get_payload(req: &Value) -> &Value {
    static EMPTY: Value = Value::Null;
    req.get("payload").unwrap_or(&EMPTY)
}

fn ok(id: Value, payload: Value) -> String {
    json!({
        "id": id,
        "status": "ok",
        "payload": payload
    })
    .to_string()
}

fn err(id: Value, message: impl Into<String>) -> String {
    json!({
        "id": id,
        "status": "error",
        "message": message.into()
    })
    .to_string()
}

fn progress_line(id: &Value, progress: &Progress) -> String {
    let mut line = json!({ "id": id, "event": "progress" });
    if let (Some(obj), Ok(Value::Object(fields))) = (line.as_object_mut(), serde_json::to_value(progress)) {
        obj.extend(fields);
        if let Some(pct) = progress.percent() {
            obj.insert("percent".into(), json!(pct));
        }
    }
    line.to_string()
}

fn emit_to(out: &Sink, line: &str) {
    let mut w = out.lock().unwrap_or_else(|p| p.into_inner());
    if writeln!(w, "{line}").and_then(|_| w.flush()).is_err() {
        tracing::warn!("host output closed");
    }
}

struct ActiveJob {
    control: JobControl,
    handle: JoinHandle<()>,
}

pub struct Server {
    engine: Arc<Engine>,
    out: Sink,
    active: Mutex<Option<ActiveJob>>,
}

impl Server {
    pub fn new(engine: Arc<Engine>, out: Sink) -> Self {
        Server {
            engine,
            out,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn emit(&self, line: &str) {
        emit_to(&self.out, line);
    }

    /// Handles one request line. Short commands are answered before this returns.
    pub fn handle_line(&self, input: &str) {
        let req: Value = match serde_json::from_str(input) {
            Ok(v) => v,
            Err(_) => {
                self.emit(
                    &json!({
                        "status": "error",
                        "message": "invalid json"
                    })
                    .to_string(),
                );
                return;
            }
        };

        let id = get_id(&req);
        let cmd = Command::from(get_cmd(&req));
        let payload = get_payload(&req);
        tracing::debug!(cmd = get_cmd(&req), "request");

        if cmd.is_long() {
            self.start_long(id, cmd, payload.clone());
            return;
        }

        let response = match cmd {
            Command::Cancel | Command::Pause | Command::Resume => self.steer(id, cmd),
            _ => match panic::catch_unwind(AssertUnwindSafe(|| handlers::run_short(&self.engine, cmd, payload))) {
                Ok(Ok(v)) => ok(id, v),
                Ok(Err(e)) => err(id, e),
                Err(_) => err(id, "internal core error"),
            },
        };
        self.emit(&response);
    }

    fn steer(&self, id: Value, cmd: Command) -> String {
        let active = self.active();
        let Some(job) = active.as_ref().filter(|j| !j.handle.is_finished()) else {
            return ok(id, json!({ "active": false }));
        };
        match cmd {
            Command::Cancel => job.control.cancel(),
            Command::Pause => job.control.pause(),
            _ => job.control.resume(),
        }
        tracing::info!(?cmd, "job control");
        ok(id, json!({ "active": true, "paused": job.control.is_paused() }))
    }

    fn start_long(&self, id: Value, cmd: Command, payload: Value) {
        let mut active = self.active();
        if active.as_ref().is_some_and(|j| !j.handle.is_finished()) {
            self.emit(&err(id, "busy"));
            return;
        }
        if let Some(done) = active.take() {
            let _ = done.handle.join();
        }

        let control = JobControl::new();
        let reporter = {
            let out = self.out.clone();
            let id = id.clone();
            Reporter::new(move |p| emit_to(&out, &progress_line(&id, &p)))
        };
        let run = RunContext::new(control.clone(), reporter);
        let engine = self.engine.clone();
        let out = self.out.clone();

        let handle = thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handlers::run_long(&engine, cmd, &payload, &run)));
            let response = match result {
                Ok(Ok(v)) => ok(id, v),
                Ok(Err(e)) => err(id, e),
                Err(_) => err(id, "internal core error"),
            };
            emit_to(&out, &response);
        });

        *active = Some(ActiveJob { control, handle });
    }

    /// Blocks until the running job, if any, has replied.
    pub fn wait(&self) {
        if let Some(job) = self.active().take() {
            let _ = job.handle.join();
        }
    }

    /// Input is closed: nobody can resume a paused job any more, so it is
    /// cancelled. A running job still finishes and replies.
    fn shutdown(&self) {
        if let Some(job) = self.active().take() {
            if job.control.is_paused() {
                tracing::info!("input closed while the job is paused, cancelling it");
                job.control.cancel();
            }
            let _ = job.handle.join();
        }
    }
}

/// Reads requests until `input` closes, then waits for the last job.
pub fn serve(engine: Arc<Engine>, input: impl BufRead, out: Sink) {
    let server = Server::new(engine, out);

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        if line.trim().is_empty() {
            continue;
        }

        server.handle_line(&line);
    }

    server.shutdown();
}
