//! REST DTOs for the datasource routes.

use azure_data_explorer_sdk::{Column, Row, Table, TableResponse};
use serde::{Deserialize, Serialize};

/// Response DTO for a tabular result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponseDto {
    pub tables: Vec<TableDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDto {
    pub table_name: String,
    pub columns: Vec<ColumnDto>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDto {
    pub column_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

impl From<TableResponse> for TableResponseDto {
    fn from(response: TableResponse) -> Self {
        Self {
            tables: response.tables.into_iter().map(TableDto::from).collect(),
        }
    }
}

impl From<Table> for TableDto {
    fn from(table: Table) -> Self {
        Self {
            table_name: table.table_name,
            columns: table.columns.into_iter().map(ColumnDto::from).collect(),
            rows: table.rows,
        }
    }
}

impl From<Column> for ColumnDto {
    fn from(column: Column) -> Self {
        Self {
            column_name: column.column_name,
            column_type: column.column_type,
        }
    }
}

/// Response DTO for the connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub message: String,
}

impl HealthDto {
    #[must_use]
    pub fn connected() -> Self {
        Self {
            status: "ok".to_owned(),
            message: "Connection success".to_owned(),
        }
    }
}
