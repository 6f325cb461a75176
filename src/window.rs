//! SDL2 presentation of finished frames (feature `window`).

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;

use crate::pipeline::StopHandle;
use crate::render::framebuffer::Frame;
use crate::sink::{FrameSink, SinkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    None,
    Quit,
}

pub struct Window {
    canvas: sdl2::render::Canvas<sdl2::video::Window>,
    // Declared before texture_creator so it is dropped first.
    texture: sdl2::render::Texture<'static>,
    texture_creator: Box<sdl2::render::TextureCreator<sdl2::video::WindowContext>>,
    event_pump: sdl2::EventPump,
    width: u32,
    height: u32,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        let texture_creator = Box::new(canvas.texture_creator());
        let event_pump = sdl_context.event_pump()?;

        // SAFETY: texture_creator is heap-allocated and lives as long as Window.
        // We ensure texture is dropped before texture_creator by struct field order.
        let texture_creator_ref: &'static sdl2::render::TextureCreator<sdl2::video::WindowContext> =
            unsafe { &*(texture_creator.as_ref() as *const _) };
        let texture = texture_creator_ref
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            canvas,
            texture,
            texture_creator,
            event_pump,
            width,
            height,
        })
    }

    pub fn poll_events(&mut self) -> WindowEvent {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => return WindowEvent::Quit,
                _ => {}
            }
        }
        WindowEvent::None
    }

    /// Upload ARGB8888 bytes of a `width × height` frame and show them.
    pub fn present(&mut self, buffer: &[u8]) -> Result<(), String> {
        self.texture
            .update(None, buffer, (self.width * 4) as usize)
            .map_err(|e| e.to_string())?;

        self.canvas.clear();
        self.canvas
            .copy(&self.texture, None, Some(Rect::new(0, 0, self.width, self.height)))?;
        self.canvas.present();
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Presents frames in a window and raises `stop` when it is closed.
///
/// With `upscaled` set the window is twice the frame size and shows the
/// upscale stage's output; otherwise it shows Display frames as they are.
pub struct WindowSink {
    window: Window,
    upscaled: bool,
    stop: StopHandle,
}

impl WindowSink {
    pub fn new(
        title: &str,
        frame_width: u32,
        frame_height: u32,
        upscaled: bool,
        stop: StopHandle,
    ) -> Result<Self, SinkError> {
        let scale = if upscaled { 2 } else { 1 };
        let window = Window::new(title, frame_width * scale, frame_height * scale)
            .map_err(SinkError::Display)?;
        Ok(Self {
            window,
            upscaled,
            stop,
        })
    }

    fn show(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if (frame.width, frame.height) != (self.window.width(), self.window.height()) {
            return Err(SinkError::Display(format!(
                "frame is {}x{}, window is {}x{}",
                frame.width,
                frame.height,
                self.window.width(),
                self.window.height()
            )));
        }
        self.window
            .present(frame.as_bytes())
            .map_err(SinkError::Display)?;
        if self.window.poll_events() == WindowEvent::Quit {
            self.stop.stop();
        }
        Ok(())
    }
}

impl FrameSink for WindowSink {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if self.upscaled {
            return Ok(());
        }
        self.show(frame)
    }

    fn consume_upscaled(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if !self.upscaled {
            return Ok(());
        }
        self.show(frame)
    }
}
