//! Download progress aggregation
//!
//! The engine reports downloads per file basename. This module maps those
//! basenames back to the pending packages they belong to, reports one
//! "downloading"/"finished" pair per package and folds per-file progress
//! into an overall percentage for the batch.

use std::path::PathBuf;
use std::sync::Arc;

use pkbridge_events::EventEmitter;
use pkbridge_types::{InfoKind, PackageRef, Status};

/// Sub and overall percentages derived from one progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub sub: u32,
    pub overall: u32,
}

#[derive(Debug, Default)]
pub struct DownloadAggregator {
    current: Option<PackageRef>,
    files: Option<Vec<String>>,
    /// Bytes (or files, for database batches) finished before the current file
    completed: i64,
    /// Size of the batch; negative for database batches, where it counts files
    total: i64,
    pending: Vec<PackageRef>,
    use_delta: bool,
    /// Destination directory when file lists are collected
    collect_into: Option<PathBuf>,
}

impl DownloadAggregator {
    #[must_use]
    pub fn new(use_delta: bool, collect_into: Option<PathBuf>) -> Self {
        Self {
            use_delta,
            collect_into,
            ..Self::default()
        }
    }

    /// Packages that downloads may belong to
    pub fn set_pending(&mut self, packages: Vec<PackageRef>) {
        self.pending = packages;
    }

    #[must_use]
    pub fn current(&self) -> Option<&PackageRef> {
        self.current.as_ref()
    }

    /// Start of a new download batch
    pub fn on_total_size<E: EventEmitter + ?Sized>(&mut self, total: i64, sink: &E) {
        if self.total > 0 && self.current.is_some() {
            self.end_package(sink);
        }

        self.completed = 0;
        self.total = total;
    }

    /// Progress for one file; returns the percentages that were reported
    pub fn on_file_progress<E: EventEmitter + ?Sized>(
        &mut self,
        basename: &str,
        completed: i64,
        total: i64,
        sink: &E,
    ) -> Option<DownloadProgress> {
        if completed > total {
            tracing::warn!(basename, completed, total, "download progress beyond file size");
            return None;
        }

        let (mut completed, mut total) = (completed, total);
        let sub = if total > 0 { completed * 100 / total } else { 0 };

        let overall = if self.total > 0 {
            (self.completed + completed) * 100 / self.total
        } else if self.total < 0 {
            // database files: the batch total counts files, not bytes
            let overall = (self.completed * 100 + sub) / -self.total;
            if completed == total {
                completed = 1;
                total = 1;
            } else {
                completed = total + 1;
            }
            overall
        } else {
            100
        };

        if completed == 0 {
            tracing::debug!(basename, "downloading file");
            sink.emit_status(Status::Download);
            self.start_file(basename, sink);
        } else if completed == total {
            self.completed += completed;
        }

        let progress = DownloadProgress {
            sub: to_percent(sub),
            overall: to_percent(overall),
        };
        sink.emit_sub_percentage(progress.sub);
        sink.emit_percentage(progress.overall);
        Some(progress)
    }

    /// Finalize a package that is still downloading
    pub fn finish<E: EventEmitter + ?Sized>(&mut self, sink: &E) {
        if self.current.is_some() {
            self.end_package(sink);
        }
    }

    fn start_file<E: EventEmitter + ?Sized>(&mut self, basename: &str, sink: &E) {
        if let Some(current) = &self.current {
            if current.has_basename(basename, self.use_delta) {
                if let Some(path) = self.resolve_path(basename) {
                    if let Some(files) = &mut self.files {
                        files.push(path);
                    }
                }
                return;
            }
            self.end_package(sink);
        }

        let Some(package) = self
            .pending
            .iter()
            .find(|pkg| pkg.has_basename(basename, self.use_delta))
            .map(Arc::clone)
        else {
            return;
        };

        sink.emit_package(InfoKind::Downloading, package.package_id(), None);
        self.files = self.resolve_path(basename).map(|path| vec![path]);
        self.current = Some(package);
    }

    fn end_package<E: EventEmitter + ?Sized>(&mut self, sink: &E) {
        let Some(package) = self.current.take() else {
            return;
        };

        let package_id = package.package_id();
        sink.emit_package(InfoKind::Finished, package_id.clone(), None);

        if let Some(files) = self.files.take() {
            sink.emit_files(package_id, files.join(";"));
        }
    }

    fn resolve_path(&self, basename: &str) -> Option<String> {
        self.collect_into
            .as_ref()
            .map(|dir| dir.join(basename).display().to_string())
    }
}

fn to_percent(value: i64) -> u32 {
    u32::try_from(value.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkbridge_events::{channel, EventReceiver, JobEvent};
    use pkbridge_types::Package;

    fn drain(rx: &mut EventReceiver) -> Vec<JobEvent> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message.event);
        }
        out
    }

    fn pkg(name: &str) -> PackageRef {
        Package::new(name, "1.0-1")
            .with_arch("x86_64")
            .with_repository("extra")
            .with_filename(format!("{name}-1.0-1-x86_64.pkg.tar.zst"))
            .into_ref()
    }

    #[test]
    fn test_package_download_reports_files() {
        let (tx, mut rx) = channel();
        let mut downloads = DownloadAggregator::new(false, Some(PathBuf::from("/tmp/dl")));
        downloads.set_pending(vec![pkg("foo")]);

        downloads.on_total_size(100, &tx);
        downloads.on_file_progress("foo-1.0-1-x86_64.pkg.tar.zst", 0, 100, &tx);
        let last = downloads
            .on_file_progress("foo-1.0-1-x86_64.pkg.tar.zst", 100, 100, &tx)
            .unwrap();
        assert_eq!(last, DownloadProgress { sub: 100, overall: 100 });

        downloads.finish(&tx);
        let events = drain(&mut rx);

        assert!(events.contains(&JobEvent::StatusChanged {
            status: Status::Download
        }));
        assert!(events.contains(&JobEvent::Files {
            package_id: "foo;1.0-1;x86_64;extra".to_string(),
            files: "/tmp/dl/foo-1.0-1-x86_64.pkg.tar.zst".to_string(),
        }));
        let finished = events
            .iter()
            .filter(|e| matches!(e, JobEvent::Package { info: InfoKind::Finished, .. }))
            .count();
        assert_eq!(finished, 1);

        // finish is idempotent
        downloads.finish(&tx);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_switching_package_finalizes_previous() {
        let (tx, mut rx) = channel();
        let mut downloads = DownloadAggregator::new(false, None);
        downloads.set_pending(vec![pkg("foo"), pkg("bar")]);

        downloads.on_total_size(200, &tx);
        downloads.on_file_progress("foo-1.0-1-x86_64.pkg.tar.zst", 0, 100, &tx);
        downloads.on_file_progress("foo-1.0-1-x86_64.pkg.tar.zst", 100, 100, &tx);
        downloads.on_file_progress("bar-1.0-1-x86_64.pkg.tar.zst", 0, 100, &tx);

        let infos: Vec<(String, InfoKind)> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Package {
                    package_id, info, ..
                } => Some((package_id, info)),
                _ => None,
            })
            .collect();

        assert_eq!(
            infos,
            vec![
                ("foo;1.0-1;x86_64;extra".to_string(), InfoKind::Downloading),
                ("foo;1.0-1;x86_64;extra".to_string(), InfoKind::Finished),
                ("bar;1.0-1;x86_64;extra".to_string(), InfoKind::Downloading),
            ]
        );
        assert_eq!(downloads.current().map(|p| p.name.as_str()), Some("bar"));
    }

    #[test]
    fn test_delta_requires_opt_in() {
        let (tx, _rx) = channel();
        let package = Package::new("foo", "2")
            .with_filename("foo-2.pkg.tar.zst")
            .with_delta("foo-1_to_2.delta")
            .into_ref();

        let mut downloads = DownloadAggregator::new(false, None);
        downloads.set_pending(vec![Arc::clone(&package)]);
        downloads.on_total_size(10, &tx);
        downloads.on_file_progress("foo-1_to_2.delta", 0, 10, &tx);
        assert!(downloads.current().is_none());

        let mut downloads = DownloadAggregator::new(true, None);
        downloads.set_pending(vec![package]);
        downloads.on_total_size(10, &tx);
        downloads.on_file_progress("foo-1_to_2.delta", 0, 10, &tx);
        assert!(downloads.current().is_some());
    }

    #[test]
    fn test_database_batch_counts_files() {
        let (tx, _rx) = channel();
        let mut downloads = DownloadAggregator::new(false, None);
        downloads.on_total_size(-2, &tx);

        let p = downloads.on_file_progress("core.db", 0, 1000, &tx).unwrap();
        assert_eq!(p.overall, 0);
        let p = downloads.on_file_progress("core.db", 500, 1000, &tx).unwrap();
        assert_eq!(p.overall, 25);
        let p = downloads.on_file_progress("core.db", 1000, 1000, &tx).unwrap();
        assert_eq!(p.overall, 50);
        let p = downloads.on_file_progress("extra.db", 0, 2000, &tx).unwrap();
        assert_eq!(p.overall, 50);
        let p = downloads.on_file_progress("extra.db", 2000, 2000, &tx).unwrap();
        assert_eq!(p.overall, 100);
    }

    #[test]
    fn test_no_batch_reports_complete() {
        let (tx, _rx) = channel();
        let mut downloads = DownloadAggregator::new(false, None);
        let p = downloads.on_file_progress("x", 5, 10, &tx).unwrap();
        assert_eq!(p, DownloadProgress { sub: 50, overall: 100 });
        assert!(downloads.on_file_progress("x", 11, 10, &tx).is_none());
    }

    #[test]
    fn test_empty_file_has_zero_sub_percentage() {
        let (tx, _rx) = channel();
        let mut downloads = DownloadAggregator::new(false, None);
        downloads.on_total_size(100, &tx);

        let p = downloads.on_file_progress("empty", 0, 0, &tx).unwrap();
        assert_eq!(p, DownloadProgress { sub: 0, overall: 0 });

        downloads.on_total_size(-2, &tx);
        let p = downloads.on_file_progress("empty.db", 0, 0, &tx).unwrap();
        assert_eq!(p, DownloadProgress { sub: 0, overall: 0 });
    }
}
