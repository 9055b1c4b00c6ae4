//! 地址批量导出（CSV）
//!
//! 逐页调用与屏幕显示相同的 `Window::render`，保证写入存储卡的内容
//! 与屏幕上看到的完全一致。先派生完全部行再创建文件，派生失败时不留下文件。

use std::io::Write;

use crate::domain::address_format::AddressFormat;
use crate::domain::path::{PathTemplate, MAX_INDEX};
use crate::error::{DerivationError, ExportError, PathError};
use crate::infrastructure::keystore::KeyDerivation;
use crate::infrastructure::storage::RemovableStorage;
use crate::service::derivation_engine::DerivationEngine;
use crate::service::pager::{Window, DEFAULT_PAGE_SIZE};

pub const CSV_HEADER: &str = "Index,Payment Address,Derivation";
pub const DEFAULT_EXPORT_COUNT: u32 = 250;
pub const EXPORT_FILE_STEM: &str = "addresses";
pub const EXPORT_DONE_MESSAGE: &str = "Address summary file written:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub index: u32,
    pub address: String,
    pub derivation: String,
}

impl ExportRow {
    pub fn to_csv_line(&self) -> String {
        format!("{},{},{}", self.index, self.address, self.derivation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub file_name: String,
    pub rows: usize,
}

impl ExportSummary {
    /// 导出完成后给操作员看的提示
    pub fn message(&self) -> String {
        format!("{}\n\n{}", EXPORT_DONE_MESSAGE, self.file_name)
    }
}

pub struct Exporter<'e, 'k, K: KeyDerivation> {
    engine: &'e DerivationEngine<'k, K>,
}

impl<'e, 'k, K: KeyDerivation> Exporter<'e, 'k, K> {
    pub fn new(engine: &'e DerivationEngine<'k, K>) -> Self {
        Self { engine }
    }

    /// 枚举索引 `0..count`，按索引升序
    pub fn export(
        &self,
        template: &PathTemplate,
        format: AddressFormat,
        count: u32,
    ) -> Result<Vec<ExportRow>, DerivationError> {
        if u64::from(count) > u64::from(MAX_INDEX) + 1 {
            return Err(DerivationError::IndexOutOfRange(count));
        }

        let mut window = Window::new(template.clone(), format, DEFAULT_PAGE_SIZE)?;
        let mut rows = Vec::with_capacity((count as usize).min(4096));

        while rows.len() < count as usize {
            let base = window.base_index();
            for result in window.render(self.engine)? {
                if rows.len() == count as usize {
                    break;
                }
                // 第 i 行必须落在索引 i 上；跳过了无效子密钥时拒绝导出，避免重复地址
                let expected = template.bind(rows.len() as u32)?;
                if result.path != expected {
                    tracing::error!(expected = %expected, derived = %result.path, "export row index shifted");
                    return Err(DerivationError::InvalidChild {
                        path: expected.to_string(),
                    });
                }
                rows.push(ExportRow {
                    index: rows.len() as u32,
                    address: result.address,
                    derivation: result.path.to_string(),
                });
            }

            let next = window.forward();
            if next.base_index() == base {
                // 已到达可翻页的上限
                break;
            }
            window = next;
        }

        if rows.len() < count as usize {
            return Err(PathError::InvalidIndex(format!(
                "cannot enumerate {} addresses from {}",
                count, template
            ))
            .into());
        }
        Ok(rows)
    }

    /// 导出到可移动存储，返回实际文件名
    pub fn export_to_storage<S: RemovableStorage>(
        &self,
        storage: &mut S,
        template: &PathTemplate,
        format: AddressFormat,
        count: u32,
    ) -> Result<ExportSummary, ExportError> {
        let rows = self.export(template, format, count)?;

        let (file_name, mut writer) = storage.create_file(EXPORT_FILE_STEM, "csv")?;
        write_csv(&rows, &mut writer)?;
        writer.flush()?;

        tracing::info!(
            file = %file_name,
            rows = rows.len(),
            template = %template,
            format = format.as_str(),
            "address summary exported"
        );
        Ok(ExportSummary {
            file_name,
            rows: rows.len(),
        })
    }
}

pub fn write_csv<W: Write>(rows: &[ExportRow], out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for row in rows {
        writeln!(out, "{}", row.to_csv_line())?;
    }
    Ok(())
}
