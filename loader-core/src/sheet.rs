use crate::config::AppConfig;
use crate::constants::sheets::VALUES_ENDPOINT;
use crate::error::{LoaderError, Result};
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 电子表格数据源：按工作表名读取全部单元格，每行是一组字符串
///
/// 返回的第一行是表头。
#[allow(async_fn_in_trait)]
pub trait SheetSource {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;
}

/// Google Sheets values 接口
#[derive(Debug, Clone)]
pub struct GoogleSheet {
    client: reqwest::Client,
    spreadsheet_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl GoogleSheet {
    pub fn new(spreadsheet_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            spreadsheet_id: spreadsheet_id.into(),
            api_key: api_key.into(),
        }
    }

    fn values_url(&self, sheet: &str) -> Result<Url> {
        let mut url = Url::parse(VALUES_ENDPOINT)
            .map_err(|e| LoaderError::sheet(format!("接口地址无效: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| LoaderError::sheet("接口地址不能追加路径"))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(sheet);
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

impl SheetSource for GoogleSheet {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(sheet)?;
        debug!("读取工作表: {} / {}", self.spreadsheet_id, sheet);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoaderError::sheet(format!("HTTP {status}: {body}")));
        }

        let range: ValueRange = response.json().await?;
        info!("工作表 {} 读取完成: {} 行", sheet, range.values.len());
        Ok(range.values)
    }
}

/// 本地 JSON 文件数据源
///
/// 文件内容可以是二维字符串数组(忽略工作表名)，
/// 也可以是工作表名到二维数组的映射。
#[derive(Debug, Clone)]
pub struct JsonSheet {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonSheetFile {
    Single(Vec<Vec<String>>),
    Book(HashMap<String, Vec<Vec<String>>>),
}

impl JsonSheet {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SheetSource for JsonSheet {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let rows = match serde_json::from_str::<JsonSheetFile>(&content)? {
            JsonSheetFile::Single(rows) => rows,
            JsonSheetFile::Book(mut book) => book.remove(sheet).ok_or_else(|| {
                LoaderError::sheet(format!(
                    "{} 中没有工作表 {sheet}",
                    self.path.display()
                ))
            })?,
        };
        info!("工作表 {} 读取完成: {} 行", sheet, rows.len());
        Ok(rows)
    }
}

/// 按配置选择的数据源：设置了本地文件时读文件，否则访问 Google
#[derive(Debug, Clone)]
pub enum ConfiguredSheet {
    Google(GoogleSheet),
    Json(JsonSheet),
}

impl ConfiguredSheet {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sheet = &config.spreadsheet;
        if let Some(file) = &sheet.file {
            return Ok(Self::Json(JsonSheet::new(config.resolve_path(file))));
        }

        let id = sheet
            .id
            .as_deref()
            .ok_or_else(|| LoaderError::sheet("缺少 spreadsheet.id"))?;
        let api_key = sheet
            .api_key
            .as_deref()
            .ok_or_else(|| LoaderError::sheet("访问 Google 表格需要 spreadsheet.api_key"))?;
        Ok(Self::Google(GoogleSheet::new(id, api_key)))
    }
}

impl SheetSource for ConfiguredSheet {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        match self {
            Self::Google(source) => source.fetch_rows(sheet).await,
            Self::Json(source) => source.fetch_rows(sheet).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_url_encodes_sheet_name() {
        let sheet = GoogleSheet::new("abc123", "KEY");
        let url = sheet.values_url("名簿 2024").unwrap();
        assert!(url.as_str().starts_with(
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/"
        ));
        assert!(!url.path().contains(' '));
        assert!(url.query().unwrap().contains("key=KEY"));
    }

    #[tokio::test]
    async fn test_json_sheet_single() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("sheet.json");
        std::fs::write(&path, r#"[["id","name"],["1","a"]]"#).unwrap();

        let rows = JsonSheet::new(&path).fetch_rows("any").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["1", "a"]);
    }

    #[tokio::test]
    async fn test_json_sheet_book() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("book.json");
        std::fs::write(&path, r#"{"members":[["id"],["1"]],"other":[]}"#).unwrap();

        let source = JsonSheet::new(&path);
        assert_eq!(source.fetch_rows("members").await.unwrap().len(), 2);
        assert!(source.fetch_rows("missing").await.is_err());
    }
}
