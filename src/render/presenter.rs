//! The seam between the scheduler and whatever puts pixels on screen.

use crate::error::Error;
use crate::processing::decode::PaddedPixelBuffer;
use crate::processing::layout::ImageGeometry;
use crate::slots::SlotId;

/// Owns two persistent textures and draws them as quads.
///
/// A frame is `begin_frame`, any number of `draw` calls composited
/// additively (`src * 1 + dst * 1`) in call order, then `end_frame` which
/// swaps buffers.
pub trait TexturePresenter {
    /// Replace the contents of `slot`'s texture. The buffer is consumed and
    /// dropped once uploaded.
    ///
    /// # Errors
    /// [`Error::Upload`] when the backend rejects the buffer. Callers log
    /// and carry on.
    fn upload(
        &mut self,
        slot: SlotId,
        geometry: &ImageGeometry,
        pixels: PaddedPixelBuffer,
    ) -> Result<(), Error>;

    /// Clear the back buffer to black.
    fn begin_frame(&mut self) -> Result<(), Error>;

    /// Draw `slot`'s quad modulated by `opacity` on all four channels.
    fn draw(&mut self, slot: SlotId, opacity: f32) -> Result<(), Error>;

    /// Present the back buffer.
    ///
    /// # Errors
    /// [`Error::DisplayClosed`] once the user asked to quit.
    fn end_frame(&mut self) -> Result<(), Error>;

    /// Service pending window events between frames, e.g. while holding an
    /// image on screen.
    fn poll(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
