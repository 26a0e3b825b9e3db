pub mod basemap;
pub mod source;
pub mod table;
pub mod topology;

pub use basemap::{load_basemap, Basemap};
pub use source::{BoundarySource, LoadEvent, LoadGate, Loader, Ticket};
pub use table::{load_table, parse_table, validate_columns, Cell, Dataset, ValidationMode};
pub use topology::{convert_bytes, to_feature_collection, Topology};
