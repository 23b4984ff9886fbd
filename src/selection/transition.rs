//! Differential preview for hover selections.
//!
//! Cross-fades between successive selection masks so that moving the
//! pointer over a magic wand target does not flicker. Newly selected pixels
//! appear at full value immediately; deselected pixels fade out by a fixed
//! step on every update.

use crate::error::{SelectionError, SelectionResult};

/// Display value subtracted from deselected pixels per update
pub const DEFAULT_DECAY_STEP: u8 = 60;

/// Result of one blender update.
#[derive(Debug)]
pub struct TransitionFrame<'a> {
    /// Mask to draw this frame
    pub display: &'a [u8],
    /// Pixels selected now but not in the previous mask
    pub added: usize,
    /// Pixels selected in the previous mask but not now
    pub removed: usize,
}

/// Session-scoped blender state. Use one instance per active hover session.
#[derive(Debug, Clone)]
pub struct MaskTransitionBlender {
    previous: Vec<u8>,
    display: Vec<u8>,
    dims: Option<(usize, usize)>,
    decay_step: u8,
}

impl Default for MaskTransitionBlender {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_STEP)
    }
}

impl MaskTransitionBlender {
    pub fn new(decay_step: u8) -> Self {
        Self {
            previous: Vec::new(),
            display: Vec::new(),
            dims: None,
            decay_step: decay_step.max(1),
        }
    }

    /// Blend `new_mask` into the display mask.
    ///
    /// A change of dimensions discards history and behaves like the first call.
    pub fn update(
        &mut self,
        new_mask: &[u8],
        width: usize,
        height: usize,
    ) -> SelectionResult<TransitionFrame<'_>> {
        let n = width * height;
        if new_mask.len() != n {
            return Err(SelectionError::BufferSize {
                expected: n,
                actual: new_mask.len(),
            });
        }
        if self.dims != Some((width, height)) {
            self.previous = vec![0; n];
            self.display = vec![0; n];
            self.dims = Some((width, height));
        }

        let mut added = 0;
        let mut removed = 0;
        let step = self.decay_step;
        for ((prev, shown), &next) in self
            .previous
            .iter_mut()
            .zip(self.display.iter_mut())
            .zip(new_mask)
        {
            let was = *prev > 0;
            let is = next > 0;
            if is {
                if !was {
                    added += 1;
                }
                *shown = 255;
            } else {
                if was {
                    removed += 1;
                }
                *shown = shown.saturating_sub(step);
            }
            *prev = if is { 255 } else { 0 };
        }

        Ok(TransitionFrame {
            display: &self.display,
            added,
            removed,
        })
    }

    /// True while some pixel is still fading out.
    pub fn is_animating(&self) -> bool {
        self.display.iter().any(|&v| v > 0 && v < 255)
    }

    pub fn display_mask(&self) -> &[u8] {
        &self.display
    }

    pub fn decay_step(&self) -> u8 {
        self.decay_step
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.previous.clear();
        self.display.clear();
        self.dims = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_copies_mask() {
        let mut blender = MaskTransitionBlender::default();
        let frame = blender.update(&[0, 255, 255, 0], 2, 2).unwrap();
        assert_eq!(frame.display, &[0, 255, 255, 0]);
        assert_eq!(frame.added, 2);
        assert_eq!(frame.removed, 0);
    }

    #[test]
    fn test_deselected_pixels_decay() {
        let mut blender = MaskTransitionBlender::new(60);
        blender.update(&[255, 255], 2, 1).unwrap();

        for n in 1..=6u32 {
            let frame = blender.update(&[255, 0], 2, 1).unwrap();
            assert_eq!(frame.display[0], 255);
            let expected = 255i32 - (n as i32) * 60;
            assert_eq!(frame.display[1] as i32, expected.max(0));
            assert_eq!(frame.removed, if n == 1 { 1 } else { 0 });
        }
        assert!(!blender.is_animating());
    }

    #[test]
    fn test_reselect_snaps_to_full() {
        let mut blender = MaskTransitionBlender::default();
        blender.update(&[255], 1, 1).unwrap();
        blender.update(&[0], 1, 1).unwrap();
        assert!(blender.is_animating());
        let frame = blender.update(&[255], 1, 1).unwrap();
        assert_eq!(frame.display, &[255]);
        assert_eq!(frame.added, 1);
    }

    #[test]
    fn test_dimension_change_resets_history() {
        let mut blender = MaskTransitionBlender::default();
        blender.update(&[255, 255, 255, 255], 2, 2).unwrap();
        let frame = blender.update(&[0, 0, 255, 0], 4, 1).unwrap();
        assert_eq!(frame.display, &[0, 0, 255, 0]);
        assert_eq!(frame.added, 1);
        assert_eq!(frame.removed, 0);
    }

    #[test]
    fn test_size_mismatch_is_error() {
        let mut blender = MaskTransitionBlender::default();
        assert!(matches!(
            blender.update(&[0, 0, 0], 2, 2),
            Err(SelectionError::BufferSize { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_clear() {
        let mut blender = MaskTransitionBlender::default();
        blender.update(&[255], 1, 1).unwrap();
        blender.clear();
        assert!(blender.display_mask().is_empty());
        let frame = blender.update(&[0], 1, 1).unwrap();
        assert_eq!(frame.display, &[0]);
        assert_eq!(frame.removed, 0);
    }
}
