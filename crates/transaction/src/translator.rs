//! Engine callbacks to job events
//!
//! [`EventTranslator`] is the [`TransactionCallbacks`] implementation handed
//! to the engine. It owns the per-transaction state (output buffer, download
//! aggregator, progress deduplication) and turns every callback into status
//! changes, package notices, messages and action log lines.

use std::collections::{BTreeSet, HashSet};

use pkbridge_events::EventEmitter;
use pkbridge_types::{Depend, InfoKind, Package, PackageRef, Role, Status};

use crate::action_log::ActionLog;
use crate::context::JobContext;
use crate::conversation;
use crate::download::DownloadAggregator;
use crate::engine::{
    Answer, EngineEvent, LogLevel, ProgressKind, Question, TransactionCallbacks,
};
use crate::output::OutputBuffer;
use crate::progress::ProgressCalculator;

/// Which way an upgrade-style change moved the version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upgrade,
    Downgrade,
    Reinstall,
}

pub struct EventTranslator {
    context: JobContext,
    output: OutputBuffer,
    downloads: DownloadAggregator,
    progress: ProgressCalculator,
    action_log: Box<dyn ActionLog>,
    /// (package, dependency) pairs already announced as optional requirements
    optdeps_seen: HashSet<(String, String)>,
}

impl EventTranslator {
    #[must_use]
    pub fn new(context: JobContext, action_log: Box<dyn ActionLog>, use_delta: bool) -> Self {
        let collect_into = match context.role() {
            Role::DownloadPackages => {
                let directory = context.params().directory.clone();
                if directory.is_none() {
                    tracing::warn!("download job without a destination directory");
                }
                directory
            }
            _ => None,
        };

        Self {
            downloads: DownloadAggregator::new(use_delta, collect_into),
            context,
            output: OutputBuffer::new(),
            progress: ProgressCalculator::new(),
            action_log,
            optdeps_seen: HashSet::new(),
        }
    }

    #[must_use]
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// Packages downloads may be attributed to
    pub fn set_pending_downloads(&mut self, packages: Vec<PackageRef>) {
        self.downloads.set_pending(packages);
    }

    /// Finalize a package still downloading and flush pending output
    pub fn finish(&mut self) {
        self.downloads.finish(&self.context);
        self.output.end(&self.context);
    }

    fn log_action(&mut self, line: &str) {
        if let Err(e) = self.action_log.log_action(line) {
            tracing::warn!("could not write action log: {e}");
        }
    }

    fn package_started(&mut self, package: &PackageRef, status: Status, info: InfoKind) {
        self.context.emit_status(status);
        self.context
            .emit_package(info, package.package_id(), package.description.clone());
        self.output.start(package, &self.context);
    }

    fn package_finished(&self, package: &Package) {
        self.context.emit_package(
            InfoKind::Finished,
            package.package_id(),
            package.description.clone(),
        );
    }

    fn add_done(&mut self, package: &PackageRef) {
        self.log_action(&format!("installed {} ({})", package.name, package.version));
        self.package_finished(package);

        if !package.optdepends.is_empty() {
            self.output.append("Optional dependencies:\n");
            for depend in &package.optdepends {
                self.output.append(&format!("{depend}\n"));
            }
        }
        self.output.end(&self.context);
    }

    fn remove_done(&mut self, package: &PackageRef) {
        self.log_action(&format!("removed {} ({})", package.name, package.version));
        self.package_finished(package);
        self.output.end(&self.context);
    }

    fn upgrade_started(&mut self, package: &PackageRef) {
        let (status, info) = if self.context.role() == Role::InstallFiles {
            (Status::Installing, InfoKind::Installing)
        } else {
            (Status::Updating, InfoKind::Updating)
        };
        self.package_started(package, status, info);
    }

    fn upgrade_done(&mut self, package: &PackageRef, old: Option<&PackageRef>, direction: Direction) {
        let line = match (direction, old) {
            (Direction::Upgrade, Some(old)) => format!(
                "upgraded {} ({} -> {})",
                package.name, old.version, package.version
            ),
            (Direction::Downgrade, Some(old)) => format!(
                "downgraded {} ({} -> {})",
                package.name, old.version, package.version
            ),
            _ => format!("reinstalled {} ({})", package.name, package.version),
        };
        self.log_action(&line);
        self.package_finished(package);

        if let (Direction::Upgrade | Direction::Downgrade, Some(old)) = (direction, old) {
            let added = new_optdepends(package, old);
            if !added.is_empty() {
                self.output.append("New optional dependencies:\n");
                for depend in added {
                    self.output.append(&format!("{depend}\n"));
                }
            }
        }
        self.output.end(&self.context);
    }

    fn optdep_required(&mut self, package: &PackageRef, depend: &Depend) {
        let depend = depend.to_string();
        if !self
            .optdeps_seen
            .insert((package.name.clone(), depend.clone()))
        {
            return;
        }
        self.context.emit_message(format!(
            "<b>{}</b>\noptionally requires {depend}\n",
            package.name
        ));
    }
}

/// Optional dependencies of `new` that `old` did not have, in sorted order
#[must_use]
pub fn new_optdepends<'a>(new: &'a Package, old: &Package) -> Vec<&'a Depend> {
    let before: BTreeSet<&Depend> = old.optdepends.iter().collect();
    let after: BTreeSet<&'a Depend> = new.optdepends.iter().collect();
    after
        .into_iter()
        .filter(|depend| !before.contains(*depend))
        .collect()
}

impl TransactionCallbacks for EventTranslator {
    fn on_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::CheckDepsStart | EngineEvent::ResolveDepsStart => {
                self.context.emit_status(Status::DependencyResolution);
            }
            EngineEvent::FileConflictsStart
            | EngineEvent::InterConflictsStart
            | EngineEvent::DeltaIntegrityStart
            | EngineEvent::DiskspaceStart => {
                self.context.emit_status(Status::TestCommit);
            }
            EngineEvent::AddStart { package } => {
                self.package_started(package, Status::Installing, InfoKind::Installing);
            }
            EngineEvent::AddDone { package } => self.add_done(package),
            EngineEvent::RemoveStart { package } => {
                self.package_started(package, Status::Removing, InfoKind::Removing);
            }
            EngineEvent::RemoveDone { package } => self.remove_done(package),
            EngineEvent::UpgradeStart { package, .. }
            | EngineEvent::DowngradeStart { package, .. }
            | EngineEvent::ReinstallStart { package, .. } => self.upgrade_started(package),
            EngineEvent::UpgradeDone { package, old } => {
                self.upgrade_done(package, Some(old), Direction::Upgrade);
            }
            EngineEvent::DowngradeDone { package, old } => {
                self.upgrade_done(package, Some(old), Direction::Downgrade);
            }
            EngineEvent::ReinstallDone { package, old } => {
                self.upgrade_done(package, old.as_ref(), Direction::Reinstall);
            }
            EngineEvent::IntegrityStart | EngineEvent::KeyringStart => {
                self.context.emit_status(Status::SignatureCheck);
            }
            EngineEvent::LoadStart => self.context.emit_status(Status::Setup),
            EngineEvent::DeltaPatchesStart | EngineEvent::DeltaPatchStart => {
                self.context.emit_status(Status::Repackaging);
            }
            EngineEvent::ScriptletInfo { line } => self.output.append(line),
            EngineEvent::RetrieveStart => self.context.emit_status(Status::Download),
            EngineEvent::OptdepRequired { package, depend } => {
                self.optdep_required(package, depend);
            }
            EngineEvent::CheckDepsDone
            | EngineEvent::FileConflictsDone
            | EngineEvent::ResolveDepsDone
            | EngineEvent::InterConflictsDone
            | EngineEvent::IntegrityDone
            | EngineEvent::LoadDone
            | EngineEvent::DeltaIntegrityDone
            | EngineEvent::DeltaPatchesDone
            | EngineEvent::DeltaPatchDone
            | EngineEvent::DeltaPatchFailed
            | EngineEvent::DiskspaceDone
            | EngineEvent::DatabaseMissing { .. }
            | EngineEvent::KeyringDone
            | EngineEvent::KeyDownloadStart
            | EngineEvent::KeyDownloadDone => {}
            EngineEvent::Other { code } => {
                tracing::warn!(code, "unhandled event");
            }
        }
    }

    fn on_question(&mut self, question: &Question) -> Answer {
        let resolution = conversation::resolve(self.context.role(), question);
        if let Some(output) = &resolution.output {
            self.output.append(output);
        }
        resolution.answer
    }

    fn on_progress(
        &mut self,
        kind: ProgressKind,
        target: &str,
        percent: i32,
        count: usize,
        current: usize,
    ) {
        if let Some(step) = self.progress.update(kind, target, percent, count, current) {
            self.context.emit_sub_percentage(step.sub);
            self.context.emit_percentage(step.overall);
        }
    }

    fn on_download(&mut self, basename: &str, completed: i64, total: i64) {
        self.downloads
            .on_file_progress(basename, completed, total, &self.context);
    }

    fn on_total_size(&mut self, total: i64) {
        self.downloads.on_total_size(total, &self.context);
    }

    fn on_log(&mut self, level: LogLevel, message: &str) {
        if message.is_empty() {
            return;
        }
        match level {
            LogLevel::Debug => tracing::debug!(target: "pkbridge::engine", "{}", message.trim_end()),
            LogLevel::Warning => {
                tracing::warn!(target: "pkbridge::engine", "{}", message.trim_end());
                self.output.append(message);
            }
            LogLevel::Error => tracing::warn!(target: "pkbridge::engine", "{}", message.trim_end()),
            LogLevel::Function => tracing::debug!(target: "pkbridge::engine", "{}", message.trim_end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::TracingActionLog;
    use crate::cancel::CancelBridge;
    use pkbridge_events::{channel, EventReceiver, JobEvent};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryLog(Arc<Mutex<Vec<String>>>);

    impl ActionLog for MemoryLog {
        fn log_action(&mut self, line: &str) -> Result<(), pkbridge_errors::Error> {
            self.0.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }

    fn translator(role: Role) -> (EventTranslator, EventReceiver, MemoryLog) {
        let (tx, rx) = channel();
        let context = JobContext::new(role, Arc::new(CancelBridge::new())).with_event_sender(tx);
        let log = MemoryLog::default();
        (
            EventTranslator::new(context, Box::new(log.clone()), false),
            rx,
            log,
        )
    }

    fn drain(rx: &mut EventReceiver) -> Vec<JobEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).map(|m| m.event).collect()
    }

    #[test]
    fn test_optdepend_diff() {
        let old = Package::new("foo", "1")
            .with_optdepend("x>=1.0".parse().unwrap())
            .with_optdepend(Depend::named("y"));
        let new = Package::new("foo", "2")
            .with_optdepend(Depend::named("z"))
            .with_optdepend("x>=1.0".parse().unwrap())
            .with_optdepend(Depend::named("y"));

        let added: Vec<String> = new_optdepends(&new, &old)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(added, vec!["z"]);
    }

    fn messages(rx: &mut EventReceiver) -> Vec<String> {
        drain(rx)
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Message { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn optdep_pair() -> (PackageRef, PackageRef) {
        let old = Package::new("foo", "1")
            .with_optdepend("x>=1.0".parse().unwrap())
            .with_optdepend(Depend::named("y"))
            .into_ref();
        let new = Package::new("foo", "2")
            .with_optdepend("x>=1.0".parse().unwrap())
            .with_optdepend(Depend::named("y"))
            .with_optdepend(Depend::named("z"))
            .into_ref();
        (new, old)
    }

    #[test]
    fn test_upgrade_reports_new_optdepends() {
        let (mut t, mut rx, log) = translator(Role::UpdatePackages);
        let (package, old) = optdep_pair();

        t.on_event(&EngineEvent::UpgradeStart {
            package: Arc::clone(&package),
            old: Arc::clone(&old),
        });
        t.on_event(&EngineEvent::UpgradeDone { package, old });

        assert_eq!(
            messages(&mut rx),
            vec!["<b>foo</b>\nNew optional dependencies:\nz\n"]
        );
        assert_eq!(*log.0.lock().unwrap(), vec!["upgraded foo (1 -> 2)"]);
    }

    #[test]
    fn test_reinstall_reports_no_new_optdepends() {
        let (mut t, mut rx, _) = translator(Role::InstallPackages);
        let (package, old) = optdep_pair();

        t.on_event(&EngineEvent::ReinstallStart {
            package: Arc::clone(&package),
            old: Some(Arc::clone(&old)),
        });
        t.on_event(&EngineEvent::ReinstallDone {
            package,
            old: Some(old),
        });

        assert!(messages(&mut rx).is_empty());
    }

    #[test]
    fn test_add_lifecycle() {
        let (mut t, mut rx, log) = translator(Role::InstallPackages);
        let package = Package::new("foo", "1.0-1")
            .with_optdepend("bar: for the bar feature".parse().unwrap())
            .into_ref();

        t.on_event(&EngineEvent::AddStart {
            package: Arc::clone(&package),
        });
        t.on_event(&EngineEvent::ScriptletInfo {
            line: "post-install hook ran\n".to_string(),
        });
        t.on_event(&EngineEvent::AddDone { package });

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            JobEvent::StatusChanged {
                status: Status::Installing
            }
        );
        assert!(matches!(
            events[1],
            JobEvent::Package {
                info: InfoKind::Installing,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            JobEvent::Package {
                info: InfoKind::Finished,
                ..
            }
        ));
        assert_eq!(
            events[3],
            JobEvent::Message {
                text: "<b>foo</b>\npost-install hook ran\nOptional dependencies:\nbar: for the bar feature\n"
                    .to_string()
            }
        );
        assert_eq!(*log.0.lock().unwrap(), vec!["installed foo (1.0-1)"]);
    }

    #[test]
    fn test_upgrade_status_depends_on_role() {
        let package = Package::new("foo", "2").into_ref();
        let old = Package::new("foo", "1").into_ref();
        let start = EngineEvent::UpgradeStart {
            package: Arc::clone(&package),
            old: Arc::clone(&old),
        };

        let (mut t, mut rx, _) = translator(Role::InstallFiles);
        t.on_event(&start);
        assert_eq!(
            drain(&mut rx)[0],
            JobEvent::StatusChanged {
                status: Status::Installing
            }
        );

        let (mut t, mut rx, log) = translator(Role::UpdatePackages);
        t.on_event(&start);
        t.on_event(&EngineEvent::DowngradeDone { package, old });
        assert_eq!(
            drain(&mut rx)[0],
            JobEvent::StatusChanged {
                status: Status::Updating
            }
        );
        assert_eq!(*log.0.lock().unwrap(), vec!["downgraded foo (1 -> 2)"]);
    }

    #[test]
    fn test_reinstall_and_remove_log_lines() {
        let (mut t, _rx, log) = translator(Role::RemovePackages);
        let package = Package::new("foo", "1").into_ref();

        t.on_event(&EngineEvent::ReinstallDone {
            package: Arc::clone(&package),
            old: None,
        });
        t.on_event(&EngineEvent::RemoveStart {
            package: Arc::clone(&package),
        });
        t.on_event(&EngineEvent::RemoveDone { package });

        assert_eq!(
            *log.0.lock().unwrap(),
            vec!["reinstalled foo (1)", "removed foo (1)"]
        );
    }

    #[test]
    fn test_optdep_required_is_announced_once() {
        let (mut t, mut rx, _) = translator(Role::InstallPackages);
        let event = EngineEvent::OptdepRequired {
            package: Package::new("foo", "1").into_ref(),
            depend: Depend::named("python"),
        };

        t.on_event(&event);
        t.on_event(&event);

        assert_eq!(
            drain(&mut rx),
            vec![JobEvent::Message {
                text: "<b>foo</b>\noptionally requires python\n".to_string()
            }]
        );
    }

    #[test]
    fn test_phase_statuses() {
        let (mut t, mut rx, _) = translator(Role::InstallPackages);
        for event in [
            EngineEvent::CheckDepsStart,
            EngineEvent::DiskspaceStart,
            EngineEvent::IntegrityStart,
            EngineEvent::LoadStart,
            EngineEvent::DeltaPatchStart,
            EngineEvent::RetrieveStart,
            EngineEvent::CheckDepsDone,
            EngineEvent::Other { code: 77 },
        ] {
            t.on_event(&event);
        }

        let statuses: Vec<Status> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::StatusChanged { status } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                Status::DependencyResolution,
                Status::TestCommit,
                Status::SignatureCheck,
                Status::Setup,
                Status::Repackaging,
                Status::Download,
            ]
        );
    }

    #[test]
    fn test_warning_log_goes_to_output() {
        let (tx, mut rx) = channel();
        let context =
            JobContext::new(Role::InstallPackages, Arc::new(CancelBridge::new())).with_event_sender(tx);
        let mut t = EventTranslator::new(context, Box::new(TracingActionLog), false);
        let package = Package::new("foo", "1").into_ref();

        t.on_event(&EngineEvent::AddStart {
            package: Arc::clone(&package),
        });
        t.on_log(LogLevel::Warning, "directory permissions differ\n");
        t.on_log(LogLevel::Debug, "noise\n");
        t.finish();

        let messages: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Message { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["<b>foo</b>\ndirectory permissions differ\n"]);
    }

    #[test]
    fn test_empty_warning_adds_no_output() {
        let (mut t, mut rx, _) = translator(Role::InstallPackages);
        let package = Package::new("foo", "1").into_ref();

        t.on_event(&EngineEvent::AddStart {
            package: Arc::clone(&package),
        });
        t.on_log(LogLevel::Warning, "");
        t.on_event(&EngineEvent::AddDone { package });

        assert!(messages(&mut rx).is_empty());
    }

    #[test]
    fn test_question_output_is_buffered() {
        let (mut t, mut rx, _) = translator(Role::InstallPackages);
        let package = Package::new("linux", "6").into_ref();

        t.on_event(&EngineEvent::AddStart {
            package: Arc::clone(&package),
        });
        let answer = t.on_question(&Question::InstallIgnorePkg {
            package: Arc::clone(&package),
        });
        t.finish();

        assert_eq!(answer, Answer::No);
        assert!(drain(&mut rx).contains(&JobEvent::Message {
            text: "<b>linux</b>\nlinux: was not ignored\n".to_string()
        }));
    }
}
