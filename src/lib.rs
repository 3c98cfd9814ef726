//! Workout-tracking core for a personal life-management application.
//!
//! Manages the lifecycle of a training session, the ordered ledger of sets
//! within it, expansion of reusable templates into concrete sets, and
//! lookup of prior performance. Persistence is abstracted behind the
//! [`store::WorkoutStore`] port; an in-memory implementation backs tests,
//! and a Postgres implementation is available behind the `database`
//! feature.
//!
//! Entry point for embedders is [`WorkoutCore`], which wires the services
//! over one shared store:
//!
//! ```
//! use std::sync::Arc;
//! use liftlog::{store::MemoryStore, WorkoutCore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), liftlog::CoreError> {
//! let core = WorkoutCore::new(Arc::new(MemoryStore::new()));
//! let bench = core.catalog.create("Bench Press", "chest").await?;
//! core.sessions.start_session("Push day").await?;
//! core.sessions.ledger().add_set(bench.id).await?;
//! core.sessions.finish_session().await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod history;
pub mod ledger;
pub mod models;
pub mod session;
pub mod store;
pub mod template;

use std::sync::Arc;

pub use catalog::ExerciseCatalog;
pub use error::{CoreError, CoreResult, StoreError};
pub use history::HistoryOracle;
pub use ledger::SetLedger;
pub use models::{
    ExerciseGroup, ExerciseHistory, ExerciseRow, SessionRow, SessionView, SetPatch, SetRow,
    SetView, TemplateItemRow, TemplateRow, TemplateView,
};
pub use session::{SessionManager, SessionState};
pub use template::{TemplateEngine, DEFAULT_SETS_TARGET};

/// All core services wired over one shared store.
pub struct WorkoutCore {
    pub catalog: ExerciseCatalog,
    pub history: HistoryOracle,
    pub templates: TemplateEngine,
    pub sessions: SessionManager,
}

impl WorkoutCore {
    pub fn new(store: Arc<dyn store::WorkoutStore>) -> Self {
        Self {
            catalog: ExerciseCatalog::new(store.clone()),
            history: HistoryOracle::new(store.clone()),
            templates: TemplateEngine::new(store.clone()),
            sessions: SessionManager::new(store),
        }
    }
}
