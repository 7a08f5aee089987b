use crate::core::buffer::Buffer;
use crate::core::symbols::SymbolTable;
use crate::error::{ProtocolError, Result};
use crate::protocol::connection::{DisconnectReason, PacketListener};
use tracing::{error, warn};

type HandlerFn = dyn FnMut(&mut Buffer, &mut SymbolTable) -> Result<()> + Send + 'static;
type DisconnectFn = dyn FnMut(DisconnectReason) + Send + 'static;

const OPCODES: usize = u8::MAX as usize + 1;

/// Routes delivered payloads to handlers keyed by a one-byte message opcode.
///
/// A payload is a run of `[opcode u8][body]` messages; each handler must
/// consume exactly its own body. Installed as a connection's
/// [`PacketListener`].
pub struct Dispatcher {
    handlers: Vec<Option<Box<HandlerFn>>>,
    on_disconnect: Option<Box<DisconnectFn>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<u8> = (0..=u8::MAX).filter(|&op| self.is_registered(op)).collect();
        f.debug_struct("Dispatcher")
            .field("registered", &registered)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: (0..OPCODES).map(|_| None).collect(),
            on_disconnect: None,
        }
    }

    /// Register the handler for `opcode`.
    ///
    /// # Errors
    /// `Custom` if the opcode already has a handler.
    pub fn register<F>(&mut self, opcode: u8, handler: F) -> Result<()>
    where
        F: FnMut(&mut Buffer, &mut SymbolTable) -> Result<()> + Send + 'static,
    {
        let slot = &mut self.handlers[opcode as usize];
        if slot.is_some() {
            return Err(ProtocolError::Custom(format!(
                "Handler already registered for opcode {opcode}"
            )));
        }
        *slot = Some(Box::new(handler));
        Ok(())
    }

    /// Builder form of [`Dispatcher::register`].
    pub fn with_handler<F>(mut self, opcode: u8, handler: F) -> Result<Self>
    where
        F: FnMut(&mut Buffer, &mut SymbolTable) -> Result<()> + Send + 'static,
    {
        self.register(opcode, handler)?;
        Ok(self)
    }

    pub fn on_disconnect<F>(&mut self, handler: F)
    where
        F: FnMut(DisconnectReason) + Send + 'static,
    {
        self.on_disconnect = Some(Box::new(handler));
    }

    #[inline]
    pub fn is_registered(&self, opcode: u8) -> bool {
        self.handlers[opcode as usize].is_some()
    }

    /// Handle the next message at the cursor.
    pub fn dispatch(&mut self, buffer: &mut Buffer, symbols: &mut SymbolTable) -> Result<()> {
        let opcode = buffer.get_u8()?;
        match self.handlers[opcode as usize].as_mut() {
            Some(handler) => handler(buffer, symbols),
            None => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// Handle messages until the payload is exhausted or one fails.
    pub fn dispatch_all(&mut self, buffer: &mut Buffer, symbols: &mut SymbolTable) -> Result<usize> {
        let mut handled = 0;
        while buffer.has_data() {
            self.dispatch(buffer, symbols)?;
            handled += 1;
        }
        Ok(handled)
    }
}

impl PacketListener for Dispatcher {
    fn on_packet(&mut self, buffer: &mut Buffer, symbols: &mut SymbolTable) {
        if let Err(e) = self.dispatch_all(buffer, symbols) {
            match e {
                ProtocolError::UnexpectedMessage => {
                    warn!(position = buffer.position(), "Unregistered opcode; rest of packet skipped")
                }
                other => error!(error = %other, "Message handler failed; rest of packet skipped"),
            }
        }
    }

    fn on_disconnect(&mut self, reason: DisconnectReason) {
        if let Some(handler) = self.on_disconnect.as_mut() {
            handler(reason);
        }
    }
}
