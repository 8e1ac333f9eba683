use glam::Vec2;
use sinew_core::math::{KINDA_SMALL_NUMBER, SMALL_NUMBER};
use smallvec::SmallVec;

use super::sample::{SampleWeight, SampleWeights};

/// Up to four samples with weights, precomputed for one grid point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridElement {
    pub samples: SmallVec<[SampleWeight; 4]>,
}

/// Lattice of `(divisions + 1)²` points over the normalized 2D input space.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendGrid {
    divisions: [u32; 2],
    elements: Vec<GridElement>,
}

impl BlendGrid {
    /// Builds the lattice from sample positions in normalized `[0, 1]²`
    /// space and their neighbor radii.
    ///
    /// A grid point lying on a sample takes that sample alone. Otherwise it
    /// takes the (at most) four nearest samples weighted by
    /// `1 / (distance / neighbor_radius)²`, normalized to sum to one.
    #[must_use]
    pub fn build(divisions: [u32; 2], positions: &[Vec2], radii: &[f32]) -> Self {
        debug_assert_eq!(positions.len(), radii.len(), "one radius per sample");
        let [dx, dy] = divisions;
        let mut elements = Vec::with_capacity(((dx + 1) * (dy + 1)) as usize);

        let mut by_distance: Vec<(usize, f32)> = Vec::with_capacity(positions.len());
        for j in 0..=dy {
            for i in 0..=dx {
                let point = Vec2::new(i as f32 / dx as f32, j as f32 / dy as f32);

                by_distance.clear();
                by_distance.extend(
                    positions
                        .iter()
                        .enumerate()
                        .map(|(index, position)| (index, position.distance(point))),
                );
                by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));

                let mut element = GridElement::default();
                match by_distance.first() {
                    Some(&(index, distance)) if distance <= KINDA_SMALL_NUMBER => {
                        element.samples.push(SampleWeight::new(index, 1.0));
                    }
                    _ => {
                        let mut total = 0.0;
                        for &(index, distance) in by_distance.iter().take(4) {
                            let ratio = distance / radii[index].max(SMALL_NUMBER);
                            let weight = 1.0 / (ratio * ratio).max(SMALL_NUMBER);
                            element.samples.push(SampleWeight::new(index, weight));
                            total += weight;
                        }
                        if total > 0.0 {
                            for sample in &mut element.samples {
                                sample.weight /= total;
                            }
                        }
                    }
                }
                elements.push(element);
            }
        }

        Self {
            divisions,
            elements,
        }
    }

    #[inline]
    #[must_use]
    pub fn divisions(&self) -> [u32; 2] {
        self.divisions
    }

    #[must_use]
    pub fn element(&self, i: u32, j: u32) -> &GridElement {
        &self.elements[(j * (self.divisions[0] + 1) + i) as usize]
    }

    /// Bilinear interpolation of the four corners of the cell containing
    /// `normalized` (already clamped to `[0, 1]²`). Appends unconsolidated
    /// entries to `out`.
    pub fn sample(&self, normalized: Vec2, out: &mut SampleWeights) {
        let [dx, dy] = self.divisions;

        let gx = normalized.x * dx as f32;
        let gy = normalized.y * dy as f32;
        let ix = (gx.floor().max(0.0) as u32).min(dx - 1);
        let iy = (gy.floor().max(0.0) as u32).min(dy - 1);
        let fx = (gx - ix as f32).clamp(0.0, 1.0);
        let fy = (gy - iy as f32).clamp(0.0, 1.0);

        let corners = [
            (ix, iy, (1.0 - fx) * (1.0 - fy)),
            (ix + 1, iy, fx * (1.0 - fy)),
            (ix, iy + 1, (1.0 - fx) * fy),
            (ix + 1, iy + 1, fx * fy),
        ];

        for (i, j, corner_weight) in corners {
            if corner_weight <= 0.0 {
                continue;
            }
            for sample in &self.element(i, j).samples {
                out.push(SampleWeight::new(
                    sample.sample_index,
                    sample.weight * corner_weight,
                ));
            }
        }
    }
}
