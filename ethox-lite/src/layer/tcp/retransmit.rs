use core::cmp;

use super::BASE_RTO;

/// The retransmission timer and round trip estimator of a connection.
///
/// All values are counted in periodic ticks. The estimator is the one of Jacobson and Karels in
/// fixed point: the smoothed round trip time is scaled by 8, its mean deviation by 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Retransmit {
    timer: u8,
    rto: u8,
    sa: u8,
    sv: u8,
    retries: u8,
}

impl Retransmit {
    /// The state of a new connection.
    pub fn new() -> Self {
        Retransmit {
            timer: BASE_RTO,
            rto: BASE_RTO,
            sa: 0,
            sv: 16,
            retries: 0,
        }
    }

    /// Ticks left until the outstanding segment is resent.
    pub fn timer(&self) -> u8 {
        self.timer
    }

    /// The current retransmission timeout.
    pub fn rto(&self) -> u8 {
        self.rto
    }

    /// The smoothed round trip time, scaled by 8.
    pub fn smoothed_rtt(&self) -> u8 {
        self.sa
    }

    /// The round trip time variation, scaled by 4.
    pub fn rtt_variation(&self) -> u8 {
        self.sv
    }

    /// Number of times the outstanding segment was resent.
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Count down one tick.
    pub fn tick(&mut self) {
        self.timer = self.timer.saturating_sub(1);
    }

    /// Check if the timer ran out.
    pub fn is_expired(&self) -> bool {
        self.timer == 0
    }

    /// Restart the timer for a newly sent segment.
    pub fn restart(&mut self) {
        self.timer = self.rto;
        self.retries = 0;
    }

    /// Reload the timer with exponential backoff for the next attempt.
    pub fn backoff(&mut self) {
        self.timer = BASE_RTO << cmp::min(self.retries, 4);
    }

    /// Count one more retransmission.
    pub fn retry(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }

    /// Forget retransmissions of an earlier segment.
    pub fn clear_retries(&mut self) {
        self.retries = 0;
    }

    /// All outstanding bytes were acknowledged.
    ///
    /// Updates the estimate unless the segment was retransmitted, then the acknowledgment may
    /// belong to either transmission. Reloads the timer.
    pub fn acknowledged(&mut self) {
        if self.retries == 0 {
            self.measure();
        }
        self.timer = self.rto;
    }

    fn measure(&mut self) {
        // Elapsed ticks since the segment was sent.
        let mut m = self.rto.wrapping_sub(self.timer) as i8;
        m = m.wrapping_sub((self.sa >> 3) as i8);
        self.sa = self.sa.wrapping_add(m as u8);
        m = m.wrapping_abs();
        m = m.wrapping_sub((self.sv >> 2) as i8);
        self.sv = self.sv.wrapping_add(m as u8);
        self.rto = (self.sa >> 3).wrapping_add(self.sv);
    }
}

impl Default for Retransmit {
    fn default() -> Self {
        Retransmit::new()
    }
}
