#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tabular_session::{
    ConnectionConfig, Connector, EndpointDescriptor, EventSink, Row, Transport, TransportEvent,
};

/// Events a [`ScriptedTransport`] replays at each step.
#[derive(Clone, Debug)]
pub struct Script {
    pub on_connect: Vec<TransportEvent>,
    pub on_submit: Vec<TransportEvent>,
    pub submit_error: Option<String>,
    pub on_close: Vec<TransportEvent>,
    pub drain_on_close: bool,
    pub create_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            on_connect: Vec::new(),
            on_submit: Vec::new(),
            submit_error: None,
            on_close: Vec::new(),
            drain_on_close: true,
            create_error: None,
        }
    }
}

impl Script {
    pub fn connect(mut self, events: impl IntoIterator<Item = TransportEvent>) -> Self {
        self.on_connect.extend(events);
        self
    }

    pub fn submit(mut self, events: impl IntoIterator<Item = TransportEvent>) -> Self {
        self.on_submit.extend(events);
        self
    }

    pub fn close(mut self, events: impl IntoIterator<Item = TransportEvent>) -> Self {
        self.on_close.extend(events);
        self
    }

    pub fn reject_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_owned());
        self
    }

    pub fn never_drain(mut self) -> Self {
        self.drain_on_close = false;
        self
    }

    pub fn fail_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_owned());
        self
    }
}

/// What the session asked of the transport.
#[derive(Debug, Default)]
pub struct CallLog {
    pub creates: usize,
    pub connects: usize,
    pub submits: Vec<String>,
    pub closes: usize,
}

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Script,
    log: Arc<Mutex<CallLog>>,
}

impl ScriptedConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::default(),
        }
    }

    pub fn log(&self) -> Arc<Mutex<CallLog>> {
        Arc::clone(&self.log)
    }

    pub fn with_log<R>(&self, f: impl FnOnce(&CallLog) -> R) -> R {
        f(&self.log.lock().expect("call log mutex must not be poisoned"))
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn create(
        &self,
        _config: &ConnectionConfig,
        events: EventSink,
    ) -> Result<ScriptedTransport, String> {
        self.log.lock().expect("call log mutex must not be poisoned").creates += 1;
        if let Some(message) = &self.script.create_error {
            return Err(message.clone());
        }
        Ok(ScriptedTransport {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            events,
        })
    }
}

pub struct ScriptedTransport {
    script: Script,
    log: Arc<Mutex<CallLog>>,
    events: EventSink,
}

impl ScriptedTransport {
    fn emit(&self, events: &[TransportEvent]) {
        for event in events {
            self.events.send(event.clone());
        }
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) {
        self.log.lock().expect("call log mutex must not be poisoned").connects += 1;
        self.emit(&self.script.on_connect);
    }

    fn submit(&mut self, query: &str) -> Result<(), String> {
        self.log
            .lock()
            .expect("call log mutex must not be poisoned")
            .submits
            .push(query.to_owned());
        if let Some(message) = &self.script.submit_error {
            return Err(message.clone());
        }
        self.emit(&self.script.on_submit);
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().expect("call log mutex must not be poisoned").closes += 1;
        self.emit(&self.script.on_close);
        if self.script.drain_on_close {
            self.events.drained();
        }
    }
}

pub fn endpoint() -> EndpointDescriptor {
    EndpointDescriptor::new("h", "d")
}

pub fn row(column: &str, value: i64) -> TransportEvent {
    TransportEvent::Row(Row::new().with(column, value))
}

pub fn completed_ok() -> TransportEvent {
    TransportEvent::RequestCompleted(None)
}

pub fn completed_err(message: &str) -> TransportEvent {
    TransportEvent::RequestCompleted(Some(message.to_owned()))
}

pub fn connect_failed(message: &str) -> TransportEvent {
    TransportEvent::ConnectFailed(message.to_owned())
}
