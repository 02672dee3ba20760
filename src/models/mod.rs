pub mod result;
pub mod visit_target;
pub mod voucher;

pub use result::{AllocationOutcome, AllocationSummary, ExportError, ItemAllocation, JournalPreview};
pub use visit_target::{
    validate_rows, PeriodType, PeriodWindow, VisitLog, VisitTargetError, VisitTargetRow,
};
pub use voucher::{
    DistributionBasis, LandedCostCharge, LandedCostItem, LandedCostVoucher, TagTable,
    VoucherError, VoucherHeader,
};
