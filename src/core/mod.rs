//! Template fill engine

pub mod filler;
pub mod placeholder;
pub mod row_group;
pub mod value;

pub use filler::{
    fill, report_filename, serialize, FillOptions, FillOutcome, FillWarning, GeneratedReport,
    TemplateEngine,
};
pub use placeholder::{CellTemplate, Marker, Segment};
pub use row_group::{find_groups, scan, validate_group, RowGroup, RowGroupInfo, TemplateScan};
