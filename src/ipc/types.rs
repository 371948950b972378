use std::path::PathBuf;

use serde::Deserialize;

use crate::app::AppData;
use crate::attendance::AttendanceSheet;
use crate::config::Config;
use crate::export::RendererRegistry;
use crate::session::AssessmentSession;
use crate::store::{KvStore, MemoryStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Box<dyn KvStore>,
    pub data: AppData,
    pub session: AssessmentSession,
    pub register: Option<AttendanceSheet>,
    pub renderers: RendererRegistry,
}

impl AppState {
    /// Starts on an in-memory store until a workspace is selected.
    pub fn new(config: Config) -> Self {
        let session = AssessmentSession::new(config.session_settings());
        Self {
            config,
            workspace: None,
            store: Box::new(MemoryStore::new()),
            data: AppData::default(),
            session,
            register: None,
            renderers: RendererRegistry::default(),
        }
    }
}
