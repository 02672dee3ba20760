pub mod allocator;
pub mod landed_cost;
pub mod recompute;
pub mod selector;
pub mod tag_cache;
pub mod visit_target;

pub use allocator::{round_half_up, Allocator};
pub use landed_cost::{ensure_persistable, BatchFailure, LandedCostService, ServiceError};
pub use recompute::{LandedCostCalculator, RecomputeInput};
pub use selector::select_by_tag;
pub use tag_cache::{TagCache, TagResolution, TagStore};
pub use visit_target::{apply_period, derive_period, record_visit, record_visit_log};
