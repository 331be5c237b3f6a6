use super::SignalServer;

impl SignalServer {
    /// Close host-only rooms idle past the configured timeout and tell each
    /// host why. Returns how many rooms were closed.
    pub fn reap_idle_rooms(&self) -> usize {
        let Some(timeout) = self.config.idle_room_timeout else {
            return 0;
        };

        let closed = self.rooms.reap_idle(timeout);
        for room in &closed {
            tracing::info!(
                room_id = %room.room.id,
                host_id = %room.room.host_id,
                idle_secs = timeout.as_secs(),
                "Closing idle room"
            );
            self.lifecycle.notify_closed(room, None);
        }
        self.metrics.add_idle_rooms_reaped(closed.len() as u64);
        closed.len()
    }

    /// Periodic room maintenance; runs until the task is dropped.
    pub async fn cleanup_task(&self) {
        let mut interval = tokio::time::interval(self.config.room_cleanup_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let reaped = self.reap_idle_rooms();
            if reaped > 0 {
                tracing::info!(
                    count = reaped,
                    active_rooms = self.rooms.len(),
                    "Cleaned up idle rooms"
                );
            }
        }
    }
}
