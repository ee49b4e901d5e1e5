use std::time::Duration;

/// Per-session counters read out when the session ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionMetrics {
    pub utterances: u64,
    pub tool_calls: u64,
    pub forced_tool_calls: u64,
    pub failed_tool_calls: u64,
    pub interventions: u64,
    pub escalations: u64,
    pub total_tool_latency: Duration,
}

impl SessionMetrics {
    pub fn record_tool_call(&mut self, success: bool, forced: bool, latency: Duration) {
        self.tool_calls += 1;
        if forced {
            self.forced_tool_calls += 1;
        }
        if !success {
            self.failed_tool_calls += 1;
        }
        self.total_tool_latency += latency;
    }

    pub fn average_tool_latency(&self) -> Duration {
        if self.tool_calls == 0 {
            Duration::ZERO
        } else {
            self.total_tool_latency / self.tool_calls as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::SessionMetrics;

    #[test]
    fn averages_over_recorded_calls() {
        let mut metrics = SessionMetrics::default();
        metrics.record_tool_call(true, false, Duration::from_millis(10));
        metrics.record_tool_call(false, true, Duration::from_millis(30));

        assert_eq!(metrics.tool_calls, 2);
        assert_eq!(metrics.forced_tool_calls, 1);
        assert_eq!(metrics.failed_tool_calls, 1);
        assert_eq!(metrics.average_tool_latency(), Duration::from_millis(20));
    }

    #[test]
    fn empty_session_has_zero_average() {
        assert_eq!(SessionMetrics::default().average_tool_latency(), Duration::ZERO);
    }
}
