/// Per-pipeline flush statistics.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ScanoutStats {
    /// Flushes that composited and read back a frame.
    pub flushes: u64,

    /// Flushes skipped for lack of a guest texture or host surface.
    pub skipped_flushes: u64,

    /// Composite textures allocated (one per guest size change).
    pub composite_allocations: u64,

    /// Total bytes read back into host surfaces.
    pub bytes_read_back: u64,

    /// Last flush time in microseconds.
    pub last_flush_time_us: u64,

    /// Total flush time in microseconds.
    pub total_flush_time_us: u64,
}

impl ScanoutStats {
    pub fn record_flush(&mut self, bytes: usize, time_us: u64) {
        self.flushes += 1;
        self.bytes_read_back += bytes as u64;
        self.last_flush_time_us = time_us;
        self.total_flush_time_us += time_us;
    }

    pub fn record_skip(&mut self) {
        self.skipped_flushes += 1;
    }

    pub fn record_allocation(&mut self) {
        self.composite_allocations += 1;
    }

    /// Mean flush time in microseconds, 0 before the first flush.
    pub fn average_flush_time_us(&self) -> u64 {
        self.total_flush_time_us
            .checked_div(self.flushes)
            .unwrap_or(0)
    }
}
