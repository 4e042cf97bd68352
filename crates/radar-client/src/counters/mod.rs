// Per-client counters mirrored to `metrics` when telemetry is enabled.

/// Snapshot of what a client has seen since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub frames_in: u64,
    pub frames_out: u64,
    pub decode_errors: u64,
    pub acks_resolved: u64,
    pub replies_resolved: u64,
    pub sync_frames: u64,
    pub sync_replayed: u64,
    pub sync_suppressed: u64,
    pub unaddressed: u64,
}

impl ClientStats {
    pub(crate) fn record_frame_in(&mut self) {
        self.frames_in += 1;
        t_counter!("radar_client_frames_in_total").increment(1);
    }

    pub(crate) fn record_frame_out(&mut self) {
        self.frames_out += 1;
        t_counter!("radar_client_frames_out_total").increment(1);
    }

    pub(crate) fn record_decode_error(&mut self) {
        self.decode_errors += 1;
        t_counter!("radar_client_decode_errors_total").increment(1);
    }

    pub(crate) fn record_acks(&mut self, resolved: usize) {
        self.acks_resolved += resolved as u64;
        t_counter!("radar_client_acks_resolved_total").increment(resolved as u64);
    }

    pub(crate) fn record_replies(&mut self, resolved: usize) {
        self.replies_resolved += resolved as u64;
        t_counter!("radar_client_replies_resolved_total").increment(resolved as u64);
    }

    pub(crate) fn record_sync(&mut self, replayed: usize, suppressed: usize) {
        self.sync_frames += 1;
        self.sync_replayed += replayed as u64;
        self.sync_suppressed += suppressed as u64;
        t_counter!("radar_client_sync_replayed_total").increment(replayed as u64);
        t_counter!("radar_client_sync_suppressed_total").increment(suppressed as u64);
    }

    pub(crate) fn record_unaddressed(&mut self) {
        self.unaddressed += 1;
        t_counter!("radar_client_unaddressed_total").increment(1);
    }

    pub(crate) fn record_pending_waiters(&self, pending: usize) {
        t_gauge!("radar_client_pending_waiters").set(pending as f64);
    }
}
