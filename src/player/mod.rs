//! Playback state machine
//!
//! On every tick the controller polls the input arbiter, decides the next
//! state, pulls a frame from the active source and hands it outward. All
//! playback state is mutated here, on the tick task, and only here.
//! Listener tasks can do nothing but publish event values.

use thiserror::Error;

use crate::input::{InputArbiter, InputEvent, SensorReading};
use crate::library::{LibraryError, VideoLibrary};
use crate::video::Frame;

const KEY_QUIT: &str = "esc";
const KEY_PLAY_CONTENT: &str = "space";

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Looping ambient video drawn from the far pool
    LoopFar,
    /// Looping ambient video drawn from the close pool
    LoopClose,
    /// Playing the content video through once
    Playing,
}

impl PlaybackState {
    pub fn is_loop(&self) -> bool {
        matches!(self, PlaybackState::LoopFar | PlaybackState::LoopClose)
    }
}

/// Which named subset informs the next loop pick. Persists across loop
/// re-picks, orthogonally to the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Far,
    Close,
}

impl Pool {
    fn loop_state(self) -> PlaybackState {
        match self {
            Pool::Far => PlaybackState::LoopFar,
            Pool::Close => PlaybackState::LoopClose,
        }
    }
}

/// Outcome of one playback tick.
#[derive(Debug, PartialEq, Eq)]
pub enum Tick {
    /// A decoded frame to hand to the presentation layer
    Frame(Frame),
    /// Nothing to render this tick (transient decode failure)
    Idle,
    /// Operator shutdown was requested
    Shutdown,
}

/// Errors that end playback.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("no loop video could be selected at startup")]
    NoInitialLoop,
}

/// The playback state machine.
///
/// Exactly one video source is active at any instant; a source being swapped
/// back into the loop rotation mid-playback is reset first.
pub struct PlaybackController {
    library: VideoLibrary,
    inputs: InputArbiter,
    close_pool: Vec<String>,
    far_pool: Vec<String>,
    content: String,
    close_distance: i32,
    state: PlaybackState,
    active_pool: Pool,
    active: String,
    close_mode: bool,
}

impl PlaybackController {
    /// Build the controller and select the initial far loop video.
    ///
    /// The content video must resolve here: the kiosk runs unattended, so a
    /// missing content video has to fail before startup completes.
    pub fn new(
        mut library: VideoLibrary,
        close_pool: Vec<String>,
        far_pool: Vec<String>,
        content: String,
        close_distance: i32,
        inputs: InputArbiter,
    ) -> Result<Self, PlayerError> {
        library.source(&content)?;
        for name in close_pool.iter().chain(far_pool.iter()) {
            if let Ok(source) = library.source_mut(name) {
                source.is_loop = true;
            }
        }

        let active = library
            .pick_from(&far_pool)?
            .ok_or(PlayerError::NoInitialLoop)?
            .to_string();
        log::info!("starting in far loop with {:?}", active);

        Ok(Self {
            library,
            inputs,
            close_pool,
            far_pool,
            content,
            close_distance,
            state: PlaybackState::LoopFar,
            active_pool: Pool::Far,
            active,
            close_mode: false,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn active_pool(&self) -> Pool {
        self.active_pool
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn is_close_mode(&self) -> bool {
        self.close_mode
    }

    pub fn library(&self) -> &VideoLibrary {
        &self.library
    }

    /// Run one playback tick: consume the latest input event, pull a frame
    /// from the active source and rotate on end-of-stream.
    ///
    /// The frame pulled on the tick that reaches end-of-stream is still
    /// returned for display; the rotation takes effect on the next tick.
    pub fn tick(&mut self) -> Result<Tick, PlayerError> {
        match self.inputs.poll_latest() {
            Some(InputEvent::Keyboard(key)) if key == KEY_QUIT => {
                log::info!("shutdown requested");
                return Ok(Tick::Shutdown);
            }
            Some(InputEvent::Keyboard(key)) if key == KEY_PLAY_CONTENT => {
                self.play_content(false)?;
            }
            // every other key is ignored
            Some(InputEvent::Keyboard(_)) => {}
            Some(InputEvent::Sensor(reading)) if self.state.is_loop() => {
                self.handle_sensor(reading)?;
            }
            // sensor readings while the content video plays are consumed
            // without effect
            Some(InputEvent::Sensor(_)) | None => {}
        }

        let frame = self.library.source_mut(&self.active)?.next_frame();

        if self.library.source(&self.active)?.at_end() {
            self.rotate_loop()?;
        }

        Ok(match frame {
            Some(frame) => Tick::Frame(frame),
            None => Tick::Idle,
        })
    }

    /// Switch to the content video.
    fn play_content(&mut self, sensor_triggered: bool) -> Result<(), PlayerError> {
        self.restart_outgoing()?;
        self.active = self.content.clone();
        self.state = PlaybackState::Playing;
        if sensor_triggered {
            self.close_mode = false;
        }
        log::info!("playing content video {:?}", self.content);
        Ok(())
    }

    fn handle_sensor(&mut self, reading: SensorReading) -> Result<(), PlayerError> {
        if reading.triggered {
            self.play_content(true)?;
        } else if reading.distance <= self.close_distance && !self.close_mode {
            self.active_pool = Pool::Close;
            let picked = self.library.pick_from(&self.close_pool)?.map(str::to_string);
            match picked {
                Some(name) => {
                    self.restart_outgoing()?;
                    log::info!("distance {} is close: looping {:?}", reading.distance, name);
                    self.active = name;
                    self.state = PlaybackState::LoopClose;
                }
                None => log::warn!("close pool selection came up empty; keeping current loop"),
            }
            self.close_mode = true;
        } else {
            // rearm the far pool; takes effect at the next end-of-stream
            self.active_pool = Pool::Far;
        }
        Ok(())
    }

    /// Reset a mid-playback source before it goes back into the loop
    /// rotation.
    fn restart_outgoing(&mut self) -> Result<(), PlayerError> {
        let source = self.library.source_mut(&self.active)?;
        if source.current_frame > 0 {
            source.restart();
        }
        Ok(())
    }

    /// End-of-stream: reset the finished source and rotate to a fresh loop
    /// video from the active pool.
    fn rotate_loop(&mut self) -> Result<(), PlayerError> {
        self.library.source_mut(&self.active)?.restart();

        let pool = match self.active_pool {
            Pool::Far => &self.far_pool,
            Pool::Close => &self.close_pool,
        };
        let picked = self.library.pick_from(pool)?.map(str::to_string);
        match picked {
            Some(name) => {
                log::debug!("looping to {:?}", name);
                self.active = name;
            }
            None => log::warn!("loop selection came up empty; replaying {:?}", self.active),
        }

        self.state = self.active_pool.loop_state();
        self.close_mode = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Mailbox;
    use crate::video::scripted_source;
    use std::collections::HashMap;

    const CONTENT: &str = "content.mp4";

    fn kiosk(close: &[&str], far: &[&str]) -> (PlaybackController, Mailbox) {
        let mut sources = HashMap::new();
        for name in close.iter().chain(far.iter()).chain([CONTENT].iter()) {
            sources.insert(name.to_string(), scripted_source(3));
        }
        let arbiter = InputArbiter::new();
        let mailbox = arbiter.mailbox();
        let controller = PlaybackController::new(
            VideoLibrary::from_sources(sources),
            close.iter().map(|s| s.to_string()).collect(),
            far.iter().map(|s| s.to_string()).collect(),
            CONTENT.to_string(),
            50,
            arbiter,
        )
        .expect("controller construction");
        (controller, mailbox)
    }

    fn key(mailbox: &Mailbox, name: &str) {
        mailbox.publish(InputEvent::Keyboard(name.to_string()));
    }

    fn sensor(mailbox: &Mailbox, distance: i32, triggered: bool) {
        mailbox.publish(InputEvent::Sensor(SensorReading {
            distance,
            triggered,
        }));
    }

    #[test]
    fn test_starts_looping_from_the_far_pool() {
        let (controller, _mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        assert_eq!(controller.state(), PlaybackState::LoopFar);
        assert_eq!(controller.active_pool(), Pool::Far);
        assert_eq!(controller.active_name(), "far.mp4");
        assert!(!controller.is_close_mode());
    }

    #[test]
    fn test_pool_members_carry_the_loop_tag() {
        let (controller, _mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        assert!(controller.library().source("far.mp4").unwrap().is_loop);
        assert!(controller.library().source("close.mp4").unwrap().is_loop);
        assert!(!controller.library().source(CONTENT).unwrap().is_loop);
    }

    #[test]
    fn test_missing_content_video_fails_construction() {
        let mut sources = HashMap::new();
        sources.insert("far.mp4".to_string(), scripted_source(3));
        let result = PlaybackController::new(
            VideoLibrary::from_sources(sources),
            vec![],
            vec!["far.mp4".to_string()],
            CONTENT.to_string(),
            50,
            InputArbiter::new(),
        );
        assert!(matches!(
            result,
            Err(PlayerError::Library(LibraryError::UnknownVideoName(_)))
        ));
    }

    #[test]
    fn test_manifest_ghost_in_far_pool_fails_construction() {
        let mut sources = HashMap::new();
        sources.insert(CONTENT.to_string(), scripted_source(3));
        let result = PlaybackController::new(
            VideoLibrary::from_sources(sources),
            vec![],
            vec!["ghost.mp4".to_string()],
            CONTENT.to_string(),
            50,
            InputArbiter::new(),
        );
        assert!(matches!(
            result,
            Err(PlayerError::Library(LibraryError::UnknownVideoName(_)))
        ));
    }

    #[test]
    fn test_space_switches_to_content_from_any_loop_state() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        key(&mailbox, "space");
        let tick = controller.tick().unwrap();
        assert!(matches!(tick, Tick::Frame(_)));
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.active_name(), CONTENT);
    }

    #[test]
    fn test_space_resets_the_outgoing_loop_video() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        controller.tick().unwrap();
        assert_eq!(controller.library().source("far.mp4").unwrap().current_frame, 1);
        key(&mailbox, "space");
        controller.tick().unwrap();
        assert_eq!(controller.library().source("far.mp4").unwrap().current_frame, 0);
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        key(&mailbox, "a");
        let tick = controller.tick().unwrap();
        assert!(matches!(tick, Tick::Frame(_)));
        assert_eq!(controller.state(), PlaybackState::LoopFar);
    }

    #[test]
    fn test_close_reading_switches_to_close_pool() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        controller.tick().unwrap();
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::LoopClose);
        assert_eq!(controller.active_pool(), Pool::Close);
        assert_eq!(controller.active_name(), "close.mp4");
        assert!(controller.is_close_mode());
        // the outgoing far video was reset before the switch
        assert_eq!(controller.library().source("far.mp4").unwrap().current_frame, 0);
    }

    #[test]
    fn test_far_reading_rearms_far_pool_without_switching() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        sensor(&mailbox, 200, false);
        controller.tick().unwrap();
        // still looping the close video; the far pool takes over at the next
        // end-of-stream
        assert_eq!(controller.state(), PlaybackState::LoopClose);
        assert_eq!(controller.active_name(), "close.mp4");
        assert_eq!(controller.active_pool(), Pool::Far);
    }

    #[test]
    fn test_close_readings_are_debounced_while_in_close_mode() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        let frames_before = controller.library().source("close.mp4").unwrap().current_frame;
        sensor(&mailbox, 30, false);
        controller.tick().unwrap();
        // no re-pick, no reset: the close loop keeps playing
        assert_eq!(controller.state(), PlaybackState::LoopClose);
        assert_eq!(
            controller.library().source("close.mp4").unwrap().current_frame,
            frames_before + 1
        );
    }

    #[test]
    fn test_sensor_trigger_flag_plays_content() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        controller.tick().unwrap();
        sensor(&mailbox, 200, true);
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.active_name(), CONTENT);
        assert_eq!(controller.library().source("far.mp4").unwrap().current_frame, 0);
    }

    #[test]
    fn test_sensor_readings_are_consumed_but_ignored_while_playing() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        key(&mailbox, "space");
        controller.tick().unwrap();
        sensor(&mailbox, 10, false);
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.active_name(), CONTENT);
        assert!(!controller.is_close_mode());
    }

    #[test]
    fn test_content_end_of_stream_returns_to_active_pool_loop() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        key(&mailbox, "space");
        controller.tick().unwrap();
        controller.tick().unwrap();
        // third pull exhausts the 3-frame content video and rotates
        let tick = controller.tick().unwrap();
        assert!(matches!(tick, Tick::Frame(_)));
        assert_eq!(controller.state(), PlaybackState::LoopFar);
        assert_eq!(controller.active_name(), "far.mp4");
        assert!(!controller.is_close_mode());
        assert_eq!(controller.library().source(CONTENT).unwrap().current_frame, 0);
    }

    #[test]
    fn test_close_loop_end_of_stream_clears_close_mode() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        assert!(controller.is_close_mode());
        controller.tick().unwrap();
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::LoopClose);
        assert!(!controller.is_close_mode());
    }

    #[test]
    fn test_empty_close_pool_keeps_current_loop() {
        let (mut controller, mailbox) = kiosk(&[], &["far.mp4"]);
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::LoopFar);
        assert_eq!(controller.active_name(), "far.mp4");
        assert_eq!(controller.active_pool(), Pool::Close);
        assert!(controller.is_close_mode());
    }

    #[test]
    fn test_escape_shuts_down_before_any_frame_pull() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        key(&mailbox, "esc");
        assert_eq!(controller.tick().unwrap(), Tick::Shutdown);
        assert_eq!(controller.library().source("far.mp4").unwrap().current_frame, 0);
    }

    #[test]
    fn test_events_are_cleared_once_consumed() {
        let (mut controller, mailbox) = kiosk(&["close.mp4"], &["far.mp4"]);
        sensor(&mailbox, 40, false);
        controller.tick().unwrap();
        // the reading was consumed; a later far rotation is not re-triggered
        controller.tick().unwrap();
        controller.tick().unwrap();
        assert_eq!(controller.state(), PlaybackState::LoopClose);
    }
}
