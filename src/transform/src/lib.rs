pub mod alias;
pub mod classify;
pub mod error;
pub mod flame;
pub mod group;
pub mod pipeline;
pub mod profiling;
pub mod project;
pub mod resource;
pub mod row;
pub mod series;
pub mod sql;
pub mod tag_enum;
pub mod time_sort;
pub mod value;

pub use error::{Result, TransformError};
pub use pipeline::{ShowMetrics, TabularRequest, transform_tabular};
pub use project::DeclaredMetric;
pub use row::{RawResult, Row};
pub use series::{FieldKind, FieldValues, Series, SeriesField, SeriesSink};
pub use value::ScalarValue;
