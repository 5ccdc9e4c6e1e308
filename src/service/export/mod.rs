use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::{service::request::RequestDetails, storage::StorageError};

use super::{request::RequestService, ServiceError};

const COLUMNS: [&str; 11] = [
    "export.columns.id",
    "export.columns.name",
    "export.columns.phone",
    "export.columns.currency",
    "export.columns.amount",
    "export.columns.comment",
    "export.columns.file",
    "export.columns.status",
    "export.columns.admin_comment",
    "export.columns.request_number",
    "export.columns.created_at",
];

/// Writes the full request ledger to an `.xlsx` file.
#[derive(Clone)]
pub struct ExportService {
    requests: RequestService,
    export_dir: PathBuf,
}

impl ExportService {
    pub fn new(requests: RequestService, export_dir: PathBuf) -> Self {
        Self { requests, export_dir }
    }

    pub async fn export_ledger(&self) -> Result<PathBuf, ServiceError> {
        let ledger = self.requests.ledger().await?;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(StorageError::from)?;
        let path = self
            .export_dir
            .join(format!("requests_{}.xlsx", Utc::now().format("%Y%m%d_%H%M%S")));

        let headers: Vec<String> = COLUMNS.iter().map(|&key| t!(key).to_string()).collect();
        let rows = ledger.len();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_workbook(&target, &headers, &ledger))
            .await
            .map_err(|e| ServiceError::Other(format!("export task failed: {}", e)))?
            .map_err(|e| StorageError::Export(e.to_string()))?;

        info!("Exported {} requests to {}", rows, path.display());
        Ok(path)
    }
}

fn write_workbook(path: &Path, headers: &[String], ledger: &[RequestDetails]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &bold)?;
    }

    for (idx, details) in ledger.iter().enumerate() {
        let row = idx as u32 + 1;
        let request = &details.request;

        worksheet.write_number(row, 0, request.id as f64)?;
        worksheet.write_string(row, 1, &details.owner.name)?;
        worksheet.write_string(row, 2, &details.owner.phone)?;
        worksheet.write_string(row, 3, &request.currency)?;
        worksheet.write_string(row, 4, request.amount.as_str())?;
        worksheet.write_string(row, 5, &request.comment)?;
        worksheet.write_string(row, 6, request.file_path.as_deref().unwrap_or(""))?;
        worksheet.write_string(row, 7, request.status.label())?;
        worksheet.write_string(row, 8, request.admin_comment.as_deref().unwrap_or(""))?;
        worksheet.write_number(row, 9, request.request_number as f64)?;
        worksheet.write_string(row, 10, request.created_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
    }

    worksheet.autofit();
    workbook.save(path)
}
