use super::types::{ColumnSpec, TableSpec};
use crate::constants::embedded::TYPE_RULES;

/// 生成服务端(MySQL/MariaDB)的 CREATE TABLE 语句
///
/// ```text
/// CREATE TABLE IF NOT EXISTS `name` (colspecs) COMMENT='c' ENGINE=e;
/// ```
///
/// 表注释和存储引擎只在定义里给出时才输出。该函数不做校验，
/// 调用前需要保证表定义合法(见 [`TableSpec::validate`])。
pub fn generate_create_table_sql(table: &TableSpec) -> String {
    let mut body = table
        .columns
        .iter()
        .map(generate_column_sql)
        .collect::<Vec<_>>()
        .join(",\n");

    // 主键
    if let Some(pk) = &table.primary_key {
        body.push_str(&format!(", PRIMARY KEY (`{pk}`)"));
    }

    // 单列索引
    if !table.index.is_empty() {
        let indexes = table
            .index
            .iter()
            .map(|c| format!("INDEX `{c}` (`{c}`)"))
            .collect::<Vec<_>>()
            .join(",");
        body.push_str(", ");
        body.push_str(&indexes);
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS `{}` ({body})", table.name);

    // 表选项
    if let Some(comment) = &table.comment {
        sql.push_str(&format!(" COMMENT='{}'", escape_literal(comment, '\'')));
    }
    if let Some(engine) = &table.engine {
        sql.push_str(&format!(" ENGINE={engine}"));
    }

    sql.push(';');
    sql
}

/// 生成服务端列定义
pub fn generate_column_sql(column: &ColumnSpec) -> String {
    let mut sql = format!(
        "`{}` {} {}",
        column.name,
        column.data_type,
        if column.allow_null { "NULL" } else { "NOT NULL" }
    );

    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {default}"));
    }

    if let Some(option) = &column.option {
        sql.push_str(&format!(" {option}"));
    }

    if let Some(comment) = &column.comment {
        sql.push_str(&format!(" COMMENT \"{}\"", escape_literal(comment, '"')));
    }

    sql
}

// 反斜杠在 MySQL 字符串里是转义符，要先处理，再把引号写两遍
fn escape_literal(text: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    text.replace('\\', "\\\\").replace(quote, &doubled)
}

/// 生成嵌入式数据库的 CREATE TABLE 语句
///
/// 列类型先经过 [`translate_embedded_type`] 转换；
/// 表注释、存储引擎、主键和索引都不输出。
pub fn generate_embedded_create_table_sql(table: &TableSpec) -> String {
    let body = table
        .columns
        .iter()
        .map(generate_embedded_column_sql)
        .collect::<Vec<_>>()
        .join(",\n");

    format!("CREATE TABLE IF NOT EXISTS `{}` ({body});", table.name)
}

fn generate_embedded_column_sql(column: &ColumnSpec) -> String {
    let data_type = translate_embedded_type(&column.data_type);
    match &column.option {
        Some(option) => format!("`{}` {data_type} {option}", column.name),
        None => format!("`{}` {data_type}", column.name),
    }
}

/// 服务端类型到嵌入式数据库类型的转换
///
/// 规则按顺序匹配，第一条命中即返回；没有命中的类型原样返回。
/// 子串匹配会把 `mediumint`、`point` 之类包含 `int` 的类型也转成 `INTEGER`，
/// 这是为了与已有数据文件保持一致。
pub fn translate_embedded_type(data_type: &str) -> String {
    let lowered = data_type.to_ascii_lowercase();
    for (pattern, target, exact) in TYPE_RULES {
        let hit = if *exact {
            lowered == *pattern
        } else {
            lowered.contains(pattern)
        };
        if hit {
            return (*target).to_string();
        }
    }
    data_type.to_string()
}
