//! Nextion-style serial touch screen.
//!
//! Implements [`ScreenPort`] on top of any [`Transport`].  Requests are
//! strictly one at a time: an instruction is written, then the adapter
//! reads until the matching reply arrives.  Touch events that show up in
//! between are queued for [`poll_touch`](ScreenPort::poll_touch).

pub mod codec;
pub mod transport;

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use log::{debug, trace};

use crate::app::ports::{ScreenPort, TouchEvent};
use crate::display::layout::Attr;
use crate::error::ScreenError;

use codec::{Response, ResponseDecoder};
pub use transport::Transport;

/// How long a `get` may take to answer.
const RESPONSE_TIMEOUT_MS: u32 = 100;

/// Touch events kept while nobody polls.
const MAX_QUEUED_TOUCHES: usize = 16;

/// The screen, driven over a serial link.
pub struct NextionScreen<L: Transport, D: DelayNs> {
    link: L,
    delay: D,
    decoder: ResponseDecoder,
    touches: VecDeque<TouchEvent>,
    tx: Vec<u8>,
    /// Gap enforced between a write and the next read.
    turnaround_ms: u32,
    wrote_since_read: bool,
}

impl<L: Transport, D: DelayNs> NextionScreen<L, D> {
    pub fn new(link: L, delay: D, turnaround_ms: u32) -> Self {
        Self {
            link,
            delay,
            decoder: ResponseDecoder::new(),
            touches: VecDeque::new(),
            tx: Vec::with_capacity(64),
            turnaround_ms,
            wrote_since_read: false,
        }
    }

    /// Give the serial link back (tests inspect what was written).
    pub fn into_link(self) -> L {
        self.link
    }

    fn send(&mut self, instruction: &str) -> Result<(), ScreenError> {
        trace!("DISPLAY: > {instruction}");
        codec::encode_instruction(instruction, &mut self.tx);
        self.link.write_all(&self.tx)
    }

    fn queue_touch(&mut self, page: u8, component: u8, pressed: bool) {
        if self.touches.len() == MAX_QUEUED_TOUCHES {
            self.touches.pop_front();
        }
        self.touches.push_back(TouchEvent {
            page,
            component,
            pressed,
        });
    }

    /// Drain whatever the link has right now.
    fn pump(&mut self, timeout_ms: u32) -> Result<Option<Response>, ScreenError> {
        let mut buf = [0u8; 32];
        let n = self.link.read(&mut buf, timeout_ms)?;
        let mut reply = None;
        for &b in &buf[..n] {
            match self.decoder.push(b) {
                Some(Response::Touch {
                    page,
                    component,
                    pressed,
                }) => self.queue_touch(page, component, pressed),
                Some(r) if reply.is_none() => reply = Some(r),
                Some(r) => debug!("DISPLAY: dropping extra reply {r:?}"),
                None => {}
            }
        }
        Ok(reply)
    }

    /// Send `instruction` and wait for the first non-event reply.
    fn request(&mut self, instruction: &str) -> Result<Response, ScreenError> {
        if self.wrote_since_read {
            self.delay.delay_ms(self.turnaround_ms);
            self.wrote_since_read = false;
        }
        self.send(instruction)?;

        let mut received = false;
        loop {
            let mut buf = [0u8; 1];
            let n = self.link.read(&mut buf, RESPONSE_TIMEOUT_MS)?;
            if n == 0 {
                self.decoder.reset();
                debug!("DISPLAY: no complete reply to '{instruction}'");
                // A reply that started but never finished is a timeout;
                // silence means the screen is not ready yet.
                return Err(if received {
                    ScreenError::Timeout
                } else {
                    ScreenError::NotReady
                });
            }
            received = true;
            match self.decoder.push(buf[0]) {
                Some(Response::Touch {
                    page,
                    component,
                    pressed,
                }) => self.queue_touch(page, component, pressed),
                Some(r) => return Ok(r),
                None => {}
            }
        }
    }

    fn write(&mut self, instruction: &str) -> Result<(), ScreenError> {
        self.send(instruction)?;
        self.wrote_since_read = true;
        Ok(())
    }
}

impl<L: Transport, D: DelayNs> ScreenPort for NextionScreen<L, D> {
    fn get_number(&mut self, attr: Attr) -> Result<i32, ScreenError> {
        match self.request(&codec::get(attr))? {
            Response::Number(v) => Ok(v),
            other => {
                debug!("DISPLAY: {attr} answered {other:?}");
                Err(ScreenError::NotReady)
            }
        }
    }

    fn get_text(&mut self, attr: Attr) -> Result<String, ScreenError> {
        match self.request(&codec::get(attr))? {
            Response::Text(t) => Ok(t),
            other => {
                debug!("DISPLAY: {attr} answered {other:?}");
                Err(ScreenError::NotReady)
            }
        }
    }

    fn set_number(&mut self, attr: Attr, value: i32) -> Result<(), ScreenError> {
        self.write(&codec::set_number(attr, value))
    }

    fn set_text(&mut self, attr: Attr, value: &str) -> Result<(), ScreenError> {
        self.write(&codec::set_text(attr, value))
    }

    fn command(&mut self, instruction: &str) -> Result<(), ScreenError> {
        self.write(instruction)
    }

    fn current_page(&mut self) -> Result<u8, ScreenError> {
        match self.request(codec::SEND_ME)? {
            Response::Page(p) => Ok(p),
            _ => Err(ScreenError::NotReady),
        }
    }

    fn poll_touch(&mut self) -> Option<TouchEvent> {
        if self.touches.is_empty() {
            match self.pump(0) {
                Ok(Some(r)) => debug!("DISPLAY: unsolicited {r:?}"),
                Ok(None) => {}
                Err(e) => debug!("DISPLAY: {e}"),
            }
        }
        self.touches.pop_front()
    }
}
