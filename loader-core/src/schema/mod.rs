mod generator;
mod types;


// 重新导出公共接口
pub use generator::{
    generate_column_sql, generate_create_table_sql, generate_embedded_create_table_sql,
    translate_embedded_type,
};
pub use types::{ColumnSpec, TableSpec};
