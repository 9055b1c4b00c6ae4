//! 可移动存储（MicroSD）
//!
//! 导出器只通过 `RemovableStorage` 写文件；主机端用目录模拟存储卡。

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// 同名文件存在时最多尝试的编号
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// 可移动存储
pub trait RemovableStorage {
    type Writer: Write;

    /// 新建一个不覆盖已有文件的文件，返回实际文件名与写入器
    fn create_file(&mut self, stem: &str, extension: &str)
        -> Result<(String, Self::Writer), ExportError>;
}

/// 以本地目录模拟的存储卡
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RemovableStorage for DirectoryStorage {
    type Writer = BufWriter<File>;

    fn create_file(
        &mut self,
        stem: &str,
        extension: &str,
    ) -> Result<(String, Self::Writer), ExportError> {
        if !self.root.is_dir() {
            return Err(ExportError::StorageUnavailable(format!(
                "no card mounted at {}",
                self.root.display()
            )));
        }

        for n in 0..MAX_NAME_ATTEMPTS {
            let name = if n == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}-{}.{}", stem, n, extension)
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
            {
                Ok(file) => return Ok((name, BufWriter::new(file))),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ExportError::Io(e)),
            }
        }

        Err(ExportError::StorageUnavailable(format!(
            "no free file name for {}.{}",
            stem, extension
        )))
    }
}
