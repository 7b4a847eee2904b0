//! Presentation wiring
//!
//! Fullscreen egui canvas: paints the current frame letterboxed on black,
//! hides the cursor, bridges raw key events to the keyboard listener and
//! drives the playback tick clock.

use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use eframe::egui::{self, Color32, ColorImage, TextureHandle, TextureOptions};

use crate::display;
use crate::player::{PlaybackController, Tick};
use crate::video::Frame;

/// Fullscreen kiosk application.
pub struct KioskApp {
    controller: PlaybackController,
    keys: Sender<String>,
    tick_interval: Duration,
    last_tick: Instant,
    texture: Option<TextureHandle>,
}

impl KioskApp {
    pub fn new(
        controller: PlaybackController,
        keys: Sender<String>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            controller,
            keys,
            tick_interval,
            last_tick: Instant::now(),
            texture: None,
        }
    }

    /// Forward raw key presses to the keyboard listener. The window is the
    /// physical keyboard's event source; normalization happens listener-side.
    fn forward_keys(&self, ctx: &egui::Context) {
        ctx.input(|input| {
            for event in &input.events {
                if let egui::Event::Key {
                    key,
                    pressed: true,
                    ..
                } = event
                {
                    let _ = self.keys.send(key.name().to_string());
                }
            }
        });
    }

    /// Run the playback tick when its period has elapsed.
    fn run_due_tick(&mut self, ctx: &egui::Context) {
        if self.last_tick.elapsed() < self.tick_interval {
            return;
        }
        self.last_tick = Instant::now();

        match self.controller.tick() {
            Ok(Tick::Frame(frame)) => self.upload_frame(ctx, frame),
            // transient decode failure: keep showing the previous frame
            Ok(Tick::Idle) => {}
            Ok(Tick::Shutdown) => {
                log::info!("kiosk shutting down");
                std::process::exit(0);
            }
            Err(e) => {
                log::error!("playback failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    fn upload_frame(&mut self, ctx: &egui::Context, frame: Frame) {
        let image = ColorImage::from_rgb(
            [frame.width as usize, frame.height as usize],
            &frame.pixels,
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("frame", image, TextureOptions::LINEAR)),
        }
    }
}

impl eframe::App for KioskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // unattended display: no cursor, ever
        ctx.output_mut(|o| o.cursor_icon = egui::CursorIcon::None);

        self.forward_keys(ctx);
        self.run_due_tick(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    let screen = ui.available_size();
                    let [width, height] = texture.size();
                    let (w, h) = display::fit_size(
                        (screen.x, screen.y),
                        (width as u32, height as u32),
                    );
                    let rect =
                        egui::Rect::from_center_size(ui.max_rect().center(), egui::vec2(w, h));
                    let uv =
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
                }
            });

        ctx.request_repaint_after(self.tick_interval.saturating_sub(self.last_tick.elapsed()));
    }
}
