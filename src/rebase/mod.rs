// 交互式 rebase：计划、状态轮询、操作编排、冲突处理与编辑器交接
pub mod conflicts;
pub mod editor_bridge;
pub mod orchestrator;
pub mod plan;
pub mod poller;
pub mod session;
pub mod situation;
pub mod state;

pub use conflicts::{ConflictQueue, ConflictResolution};
pub use orchestrator::RebaseTransition;
pub use plan::{PlanEditError, RebaseAction, RebasePlan, RebaseStep};
pub use session::RebaseSession;
pub use situation::{classify, RebaseSituation, SituationKind};
pub use state::{RebasePhase, RebaseState};
