use crate::error::Result;
use crate::session::SessionController;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keys that cancel the active scan session.
///
/// Raw mode turns Ctrl+C into a key event instead of SIGINT, so it is matched here too.
pub fn is_cancel_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char(' ') => true,
        _ => false,
    }
}

/// Terminal stand-in for tapping the preview: a key press cancels the scan
pub struct KeyboardInputHandler {
    controller: SessionController,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - press ESC, q, SPACE or Ctrl+C to cancel the scan");

        let controller = self.controller.clone();
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            // Only handle key press events (not release)
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }

                            if is_cancel_key(&key_event) {
                                info!("{:?} pressed - cancelling scan", key_event.code);
                                if !controller.cancel() {
                                    debug!("No active scan to cancel");
                                }
                                break;
                            }

                            debug!("Key pressed: {:?}", key_event.code);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        debug!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to leave raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::{BarcodeDecoder, ScriptedBarcodeDecoder};
    use crate::bitmap::RawBitmapDecoder;
    use crate::camera::ScriptedCamera;
    use crate::frame::{AlphaMode, PixelLayout};
    use std::sync::Arc;

    fn controller() -> SessionController {
        SessionController::builder()
            .device(Arc::new(ScriptedCamera::repeating(1, 1, vec![0; 4])))
            .bitmap_decoder(Arc::new(RawBitmapDecoder::new(
                PixelLayout::Rgba8,
                AlphaMode::Ignore,
            )))
            .decoder_factory(|| {
                Arc::new(ScriptedBarcodeDecoder::never()) as Arc<dyn BarcodeDecoder>
            })
            .build()
            .unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_cancel_keys() {
        assert!(is_cancel_key(&key(KeyCode::Esc)));
        assert!(is_cancel_key(&key(KeyCode::Char('q'))));
        assert!(is_cancel_key(&key(KeyCode::Char(' '))));
        assert!(!is_cancel_key(&key(KeyCode::Enter)));
        assert!(!is_cancel_key(&key(KeyCode::Char('x'))));
    }

    #[test]
    fn test_ctrl_c_cancels_in_raw_mode() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_cancel_key(&ctrl_c));

        // A plain 'c' is not a cancel key
        assert!(!is_cancel_key(&key(KeyCode::Char('c'))));
    }

    #[tokio::test]
    async fn test_keyboard_handler_creation() {
        let handler = KeyboardInputHandler::new(controller());
        assert!(!handler.cancellation_token.is_cancelled());
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let handler = KeyboardInputHandler::new(controller());

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
