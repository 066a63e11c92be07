//! Scan and session orchestration.
//!
//! Leaves first: `types` and `backend` define the data model and the platform
//! capability surface; `session`, `integrity`, `scan`/`progress`, `results`,
//! `derive` and `presenter` are the components; `controller` wires them into
//! the application state machine.

pub mod avatar;
pub mod backend;
pub mod controller;
pub mod derive;
pub mod integrity;
pub mod presenter;
pub mod progress;
pub mod results;
pub mod scan;
pub mod session;
pub mod types;

pub use backend::{Backend, ConnectionPage};
pub use controller::{AppController, AppSnapshot, ListRow, ListWindow, NoopObserver, StateObserver, UserError};
pub use session::{MemorySessionStore, SessionManager, SessionStore};
pub use types::{
    AppStatus, Category, DerivationState, Filter, IntegrityBand, IntegrityLevel, Profile,
    ScanProgress, ScanResult, ScanStage, Session, SessionOrigin, SortOrder,
};
