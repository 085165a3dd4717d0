//! In-memory `OscLink` doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use faderlink_osc::Message;
use faderlink_transport::{OscLink, Result, TransportError};

type SendFn = dyn Fn(&Message, usize) -> Result<()> + Send + Sync;
type InquireFn = dyn Fn(&Message, usize) -> Result<Message> + Send + Sync;

/// A link whose behavior is supplied per call by closures. The second
/// closure argument is the zero-based call number.
pub(crate) struct ScriptedLink {
    on_send: Box<SendFn>,
    on_inquire: Box<InquireFn>,
    sends: AtomicUsize,
    inquiries: AtomicUsize,
    sent: Mutex<Vec<Message>>,
}

impl ScriptedLink {
    pub(crate) fn new<S, I>(on_send: S, on_inquire: I) -> Self
    where
        S: Fn(&Message, usize) -> Result<()> + Send + Sync + 'static,
        I: Fn(&Message, usize) -> Result<Message> + Send + Sync + 'static,
    {
        Self {
            on_send: Box::new(on_send),
            on_inquire: Box::new(on_inquire),
            sends: AtomicUsize::new(0),
            inquiries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Accepts every send; answers every inquiry with `level`.
    pub(crate) fn steady(level: f32) -> Self {
        Self::new(
            |_, _| Ok(()),
            move |req, _| Ok(Message::new(req.address()).with_float(level)),
        )
    }

    /// Answers inquiries with the given levels in turn, repeating the last.
    pub(crate) fn levels(levels: Vec<f32>) -> Self {
        Self::new(
            |_, _| Ok(()),
            move |req, n| {
                let level = levels[n.min(levels.len() - 1)];
                Ok(Message::new(req.address()).with_float(level))
            },
        )
    }

    /// Every send and inquiry times out.
    pub(crate) fn dead() -> Self {
        Self::new(|_, _| Err(timeout()), |_, _| Err(timeout()))
    }

    pub(crate) fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub(crate) fn inquiry_count(&self) -> usize {
        self.inquiries.load(Ordering::SeqCst)
    }

    /// Messages whose send succeeded, in order.
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

impl OscLink for ScriptedLink {
    fn send(&self, message: &Message) -> Result<()> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        (self.on_send)(message, n)?;
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn inquire(&self, request: &Message) -> Result<Message> {
        let n = self.inquiries.fetch_add(1, Ordering::SeqCst);
        (self.on_inquire)(request, n)
    }
}

pub(crate) fn timeout() -> TransportError {
    TransportError::Timeout(Duration::from_millis(1))
}

/// A tiny stateful console: remembers fader levels and names written to it
/// and answers queries from that state.
pub(crate) struct ConsoleLink {
    levels: Mutex<HashMap<String, f32>>,
    names: Mutex<HashMap<String, String>>,
    info: Vec<String>,
}

impl ConsoleLink {
    pub(crate) fn new() -> Self {
        Self {
            levels: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            info: vec![
                "V2.07".to_string(),
                "osc-server".to_string(),
                "X32".to_string(),
                "4.06".to_string(),
            ],
        }
    }

    pub(crate) fn with_level(self, path: &str, level: f32) -> Self {
        self.levels.lock().unwrap().insert(path.to_string(), level);
        self
    }

    pub(crate) fn level_at(&self, path: &str) -> Option<f32> {
        self.levels.lock().unwrap().get(path).copied()
    }

    pub(crate) fn name_at(&self, path: &str) -> Option<String> {
        self.names.lock().unwrap().get(path).cloned()
    }
}

impl OscLink for ConsoleLink {
    fn send(&self, message: &Message) -> Result<()> {
        let path = message.address_str().unwrap_or_default().to_string();
        if let Some(level) = message.first_float() {
            self.levels.lock().unwrap().insert(path, level);
        } else if let Some(name) = message.strings().into_iter().next() {
            self.names.lock().unwrap().insert(path, name);
        }
        Ok(())
    }

    fn inquire(&self, request: &Message) -> Result<Message> {
        let path = request.address_str().unwrap_or_default();
        let mut reply = Message::new(path);
        if path == "/info" {
            for s in &self.info {
                reply = reply.with_string(s);
            }
        } else if path.ends_with("/config/name") {
            let name = self.name_at(path).unwrap_or_default();
            reply = reply.with_string(name);
        } else {
            reply = reply.with_float(self.level_at(path).unwrap_or(0.0));
        }
        Ok(reply)
    }
}
