//! 配置模块，负责从JSON文件加载字段schema和issue数据集

use crate::executor::Issue;
use crate::schema::{FieldSpec, FieldType, Schema};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 数据集加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),
    #[error("无法读取配置文件 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解析JSON配置文件 {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: serde::de::DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let path_ref = path.as_ref();

    // 检查文件是否存在
    if !path_ref.exists() {
        return Err(ConfigError::NotFound(path_ref.display().to_string()));
    }

    let content = fs::read_to_string(path_ref).map_err(|e| ConfigError::Io {
        path: path_ref.display().to_string(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| ConfigError::Json {
        path: path_ref.display().to_string(),
        source: e,
    })
}

/// 从JSON文件加载字段schema（FieldSpec数组）
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<Schema, ConfigError> {
    read_json(path)
}

/// 从JSON文件加载issue数据集
pub fn load_issues<P: AsRef<Path>>(path: P) -> Result<Vec<Issue>, ConfigError> {
    read_json(path)
}

/// 创建默认schema（用于测试或fallback）
pub fn default_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::system("key", FieldType::String),
        FieldSpec::system("type", FieldType::String),
        FieldSpec {
            values: vec![
                "Open".to_string(),
                "In Progress".to_string(),
                "In Review".to_string(),
                "Done".to_string(),
            ],
            ..FieldSpec::system("status", FieldType::String)
        },
        FieldSpec::system("assignee", FieldType::String),
        FieldSpec::system("created", FieldType::Date),
        FieldSpec::system("updated", FieldType::Date),
        FieldSpec {
            values: vec![
                "Highest".to_string(),
                "High".to_string(),
                "Medium".to_string(),
                "Low".to_string(),
            ],
            ..FieldSpec::new("priority", FieldType::String)
        },
        FieldSpec::new("summary", FieldType::String),
        FieldSpec::new("storyPoints", FieldType::Number),
        FieldSpec {
            sortable: false,
            ..FieldSpec::new("labels", FieldType::List)
        },
    ])
}
