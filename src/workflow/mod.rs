pub mod entrant_ctx;
pub mod entrant_flow;
pub mod group_flow;

pub use entrant_ctx::{EntrantCtx, EntrantRole};
pub use entrant_flow::{AddressMode, EntrantFlow, FillReport, PhotoDirs};
pub use group_flow::{GroupFlow, RunOutcome, WorkflowState};
