use super::value::Value;
use crate::error::{LoaderError, Result};

/// 服务端单行插入语句
///
/// `INSERT INTO db.table (c1, c2) values (?, ?)`
pub fn server_insert_sql(qualified_table: &str, columns: &[String]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {qualified_table} ({}) values ({placeholders})",
        columns.join(", ")
    )
}

/// 嵌入式数据库插入语句
///
/// `INSERT INTO table (c1,c2) VALUES (?,?)`
pub fn embedded_insert_sql(table: &str, columns: &[String]) -> String {
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(",")
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

/// 检查每一行的列数是否与列名一致
pub fn check_row_width(columns: &[String], row: &[Value]) -> Result<()> {
    if columns.len() != row.len() {
        return Err(LoaderError::RowWidth {
            expected: columns.len(),
            actual: row.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<String> {
        vec!["c1".to_string(), "c2".to_string(), "c3".to_string()]
    }

    #[test]
    fn test_server_insert_sql() {
        assert_eq!(
            server_insert_sql("shop.orders", &cols()),
            "INSERT INTO shop.orders (c1, c2, c3) values (?, ?, ?)"
        );
    }

    #[test]
    fn test_embedded_insert_sql() {
        assert_eq!(
            embedded_insert_sql("orders", &cols()),
            "INSERT INTO orders (c1,c2,c3) VALUES (?,?,?)"
        );
    }

    #[test]
    fn test_check_row_width() {
        let row = vec![Value::from(1), Value::from("a"), Value::Null];
        assert!(check_row_width(&cols(), &row).is_ok());
        assert!(matches!(
            check_row_width(&cols(), &row[..2]),
            Err(LoaderError::RowWidth {
                expected: 3,
                actual: 2
            })
        ));
    }
}
