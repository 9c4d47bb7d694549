mod result_set;
mod row;
mod table;

pub use result_set::ResultSet;
pub use row::DbRow;
pub use table::Table;
