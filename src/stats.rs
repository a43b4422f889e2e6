use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

// ====== PROCESSING STATISTICS ======
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub partitions_built: AtomicU64,
    pub partitions_skipped: AtomicU64,
    pub partitions_failed: AtomicU64,
    pub silver_rows: AtomicU64,
    pub silver_rows_dropped: AtomicU64,
    pub titles_added: AtomicU64,
    pub gold_files_written: AtomicU64,
    pub specifics_files_written: AtomicU64,
    pub windows_skipped: AtomicU64,
    pub specifics_files_pruned: AtomicU64,
    pub gold_files_unreadable: AtomicU64,
    pub derivations_blocked: AtomicU64,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn log_summary(&self) {
        info!("Final Processing Statistics:");
        info!("  Gold partitions built: {}", Self::get(&self.partitions_built));
        info!("  Gold partitions skipped: {}", Self::get(&self.partitions_skipped));
        info!("  Gold partitions failed: {}", Self::get(&self.partitions_failed));
        info!("  Silver rows read: {}", Self::get(&self.silver_rows));
        info!("  Silver rows dropped: {}", Self::get(&self.silver_rows_dropped));
        info!("  Dictionary titles added: {}", Self::get(&self.titles_added));
        info!("  Gold files written: {}", Self::get(&self.gold_files_written));
        info!("  Specifics files written: {}", Self::get(&self.specifics_files_written));
        info!("  Partial windows skipped: {}", Self::get(&self.windows_skipped));
        info!("  Specifics files pruned: {}", Self::get(&self.specifics_files_pruned));
        info!("  Unreadable Gold files: {}", Self::get(&self.gold_files_unreadable));
        info!("  Derivations blocked by unreadable Gold: {}", Self::get(&self.derivations_blocked));
        info!("  {}", get_memory_usage());
    }
}

// ====== MEMORY MONITORING ======
pub fn get_memory_usage() -> String {
    if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
        for line in status.lines() {
            if line.starts_with("VmRSS:") {
                return line.to_string();
            }
        }
    }
    "Memory info unavailable".to_string()
}
