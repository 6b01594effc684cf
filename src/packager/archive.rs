//! Package archive layout
//!
//! | Path | Content |
//! |------|---------|
//! | `package.toml` | Normalized package descriptor |
//! | `buildpacks/<n>/` | Main buildpack (n = 0), then URI dependencies |
//! | `images/<n>.tar` | Saved dependency images |
//!
//! Writing is blocking; run it off the async executor. The cancellation
//! token is checked before every entry.

use crate::buildpackage::PackageConfig;
use crate::error::{BpackError, BpackResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Streaming writer for a package archive
pub struct PackageArchive {
    builder: tar::Builder<File>,
    cancel: CancellationToken,
    buildpacks: usize,
    images: usize,
}

impl PackageArchive {
    /// Start an archive in an already-open file
    pub fn new(file: File, cancel: CancellationToken) -> Self {
        Self {
            builder: tar::Builder::new(file),
            cancel,
            buildpacks: 0,
            images: 0,
        }
    }

    fn check_cancelled(&self) -> BpackResult<()> {
        if self.cancel.is_cancelled() {
            Err(BpackError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Add a directory tree one entry at a time, in name order
    fn append_tree(&mut self, dest: &str, root: &Path) -> BpackResult<()> {
        let io_err = |path: &Path, e: std::io::Error| {
            BpackError::io(format!("adding {} to archive", path.display()), e)
        };

        let mut pending = vec![(root.to_path_buf(), PathBuf::from(dest))];
        while let Some((source, name)) = pending.pop() {
            self.check_cancelled()?;

            let metadata = std::fs::metadata(&source).map_err(|e| io_err(&source, e))?;
            if !metadata.is_dir() {
                self.builder
                    .append_path_with_name(&source, &name)
                    .map_err(|e| io_err(&source, e))?;
                continue;
            }

            self.builder
                .append_dir(&name, &source)
                .map_err(|e| io_err(&source, e))?;

            let mut children = std::fs::read_dir(&source)
                .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
                .map_err(|e| io_err(&source, e))?;
            children.sort_by_key(|entry| entry.file_name());

            for child in children.into_iter().rev() {
                pending.push((child.path(), name.join(child.file_name())));
            }
        }
        Ok(())
    }

    /// Write the normalized descriptor as `package.toml`
    pub fn append_descriptor(&mut self, config: &PackageConfig) -> BpackResult<()> {
        self.check_cancelled()?;
        let content = toml::to_string_pretty(config)?;

        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);

        self.builder
            .append_data(&mut header, "package.toml", content.as_bytes())
            .map_err(|e| BpackError::io("writing package.toml to archive", e))
    }

    /// Add a buildpack directory or archive file under the next index
    pub fn append_buildpack(&mut self, source: &Path) -> BpackResult<()> {
        self.check_cancelled()?;
        let dest = format!("buildpacks/{}", self.buildpacks);

        if source.is_dir() {
            self.append_tree(&dest, source)?;
        } else {
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "buildpack.tgz".to_string());
            self.builder
                .append_path_with_name(source, format!("{}/{}", dest, file_name))
                .map_err(|e| {
                    BpackError::io(format!("adding {} to archive", source.display()), e)
                })?;
        }

        self.buildpacks += 1;
        Ok(())
    }

    /// Add a saved image archive under the next index
    pub fn append_image(&mut self, image_archive: &Path) -> BpackResult<()> {
        self.check_cancelled()?;
        let dest = format!("images/{}.tar", self.images);
        self.builder
            .append_path_with_name(image_archive, &dest)
            .map_err(|e| {
                BpackError::io(format!("adding {} to archive", image_archive.display()), e)
            })?;
        self.images += 1;
        Ok(())
    }

    /// Write the trailer, flush to disk and hand back the file
    pub fn finish(self) -> BpackResult<File> {
        self.check_cancelled()?;
        let file = self
            .builder
            .into_inner()
            .map_err(|e| BpackError::io("finishing package archive", e))?;
        file.sync_all()
            .map_err(|e| BpackError::io("syncing package archive", e))?;
        Ok(file)
    }
}
