//! A software nic whose frames come from and go to the program itself.
//!
//! Frames to be received are queued by the caller, every frame sent by the stack is captured in
//! order. This is how the layer tests drive an interface without a real link.
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::{Device, Result};
use crate::layer::Error;

/// A device backed by in-memory frame queues.
#[derive(Debug, Default)]
pub struct External {
    /// Frames pending to be received, in order.
    inbound: VecDeque<Vec<u8>>,

    /// All frames sent so far.
    sent: Vec<Vec<u8>>,

    /// Refuse all transmissions, emulating a dead link.
    link_down: bool,
}

impl External {
    /// Create a device with no pending frames.
    pub fn new() -> Self {
        External::default()
    }

    /// Queue a frame to be received.
    pub fn push_recv(&mut self, frame: &[u8]) {
        self.inbound.push_back(frame.to_vec());
    }

    /// Remaining number of frames to receive.
    pub fn to_recv(&self) -> usize {
        self.inbound.len()
    }

    /// All frames sent since the last call to `take_sent`.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// The most recently sent frame.
    pub fn last_sent(&self) -> Option<&[u8]> {
        self.sent.last().map(Vec::as_slice)
    }

    /// Remove and return all sent frames.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        core::mem::replace(&mut self.sent, Vec::new())
    }

    /// Make all further transmissions fail.
    pub fn set_link_down(&mut self, down: bool) {
        self.link_down = down;
    }
}

impl Device for External {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        if self.link_down {
            return Err(Error::Device);
        }

        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn recv_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        while let Some(frame) = self.inbound.pop_front() {
            if frame.len() > buffer.len() {
                net_debug!("external: discarding frame of {} bytes", frame.len());
                continue;
            }

            buffer[..frame.len()].copy_from_slice(&frame);
            return Ok(frame.len());
        }

        Ok(0)
    }
}
