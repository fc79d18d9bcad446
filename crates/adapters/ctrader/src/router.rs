// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Ordered dispatch of inbound messages to registered handlers.

use std::{
    cell::RefCell,
    fmt::Display,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use forex_network::ProtoMessage;
use indexmap::IndexMap;

use crate::{
    common::consts::{PAYLOAD_ACCOUNT_DISCONNECT_EVENT, PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT},
    session::SessionHandle,
};

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered message handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocates a process-unique handler id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// A handler receives the live session handle and the inbound envelope, returning `true` if
/// it handled the message.
pub type MessageHandler = Rc<dyn Fn(&SessionHandle, &ProtoMessage) -> bool>;

/// How a message is offered to the registered handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Stop after the first handler returning `true`.
    StopOnFirstHandled,
    /// Offer the message to every handler.
    Broadcast,
}

impl DispatchMode {
    /// Returns the mode used for messages with `payload_type`.
    ///
    /// Account level notifications may concern several independent subscribers.
    #[must_use]
    pub const fn for_payload(payload_type: u32) -> Self {
        match payload_type {
            PAYLOAD_ACCOUNT_DISCONNECT_EVENT | PAYLOAD_ACCOUNTS_TOKEN_INVALIDATED_EVENT => {
                Self::Broadcast
            }
            _ => Self::StopOnFirstHandled,
        }
    }
}

/// Result of a single [`MessageRouter::dispatch`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// If at least one handler returned `true`.
    pub handled: bool,
    /// Handlers which panicked, with the panic message.
    pub failures: Vec<(HandlerId, String)>,
}

/// Registration-ordered table of message handlers.
///
/// Dispatch iterates over a snapshot, so handlers may add or remove handlers (including
/// themselves) while a message is being dispatched.
#[derive(Clone, Default)]
pub struct MessageRouter {
    handlers: Rc<RefCell<IndexMap<HandlerId, MessageHandler>>>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(MessageRouter))
            .field("handlers", &self.handlers.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MessageRouter {
    /// Creates a new empty [`MessageRouter`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`, returning `false` if `id` is already registered.
    pub fn add(&self, id: HandlerId, handler: MessageHandler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&id) {
            return false;
        }
        handlers.insert(id, handler);
        true
    }

    /// Unregisters `id`, returning `false` if it was not registered.
    pub fn remove(&self, id: HandlerId) -> bool {
        self.handlers.borrow_mut().shift_remove(&id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: HandlerId) -> bool {
        self.handlers.borrow().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }

    /// Offers `message` to the registered handlers in registration order.
    ///
    /// A panicking handler is recorded in the outcome and dispatch continues with the next one.
    pub fn dispatch(
        &self,
        handle: &SessionHandle,
        message: &ProtoMessage,
        mode: DispatchMode,
    ) -> DispatchOutcome {
        let snapshot: Vec<(HandlerId, MessageHandler)> = self
            .handlers
            .borrow()
            .iter()
            .map(|(id, handler)| (*id, handler.clone()))
            .collect();

        let mut outcome = DispatchOutcome::default();

        for (id, handler) in snapshot {
            // Handlers removed by an earlier handler in this dispatch are skipped
            if !self.contains(id) {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| handler(handle, message))) {
                Ok(true) => {
                    outcome.handled = true;
                    if mode == DispatchMode::StopOnFirstHandled {
                        break;
                    }
                }
                Ok(false) => {}
                Err(panic) => outcome.failures.push((id, panic_message(panic.as_ref()))),
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
