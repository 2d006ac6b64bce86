use crate::errors::Result;
use crate::models::aggregators::ChromatogramGroupPoints;
use crate::models::request::ChromatogramGroup;

/// Receives finished chromatogram groups, in request order.
pub trait ChromatogramSink {
    fn write_group(
        &mut self,
        group: &ChromatogramGroup,
        points: ChromatogramGroupPoints,
    ) -> Result<()>;

    /// Called once after the last group.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
