//! Index spatial des rectangles englobants (R-tree)
//!
//! Sert uniquement à élaguer les paires : le prédicat exact reste appliqué à
//! chaque candidat, et les candidats sortent triés pour conserver l'ordre
//! d'énumération de la boucle exhaustive.

use geo::Rect;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::types::HasGeometry;

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree des rectangles englobants, indexé par position dans le jeu
pub struct EnvelopeIndex {
    tree: RTree<Entry>,
}

impl EnvelopeIndex {
    /// Construit l'index en bulk-load. Une géométrie sans rectangle
    /// englobant (vide) n'est jamais candidate.
    pub fn build<F: HasGeometry>(features: &[F]) -> Self {
        let entries: Vec<Entry> = features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let rect = f.geometry().bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(corner(rect.min()), corner(rect.max())),
                    i,
                ))
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Positions dont le rectangle touche `rect` (bord inclus), triées
    pub fn candidates(&self, rect: &Rect) -> Vec<usize> {
        let envelope = AABB::from_corners(corner(rect.min()), corner(rect.max()));
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits
    }
}

fn corner(c: geo::Coord) -> [f64; 2] {
    [c.x, c.y]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Areal, Attributes, ExternalFeature};
    use geo::{coord, polygon};

    fn square(id: &str, x: f64, y: f64) -> ExternalFeature {
        ExternalFeature {
            id: id.to_string(),
            geometry: Areal::Polygon(polygon![
                (x: x, y: y),
                (x: x + 1.0, y: y),
                (x: x + 1.0, y: y + 1.0),
                (x: x, y: y + 1.0),
            ]),
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn test_candidates_sorted_and_pruned() {
        let features: Vec<ExternalFeature> = (0..50)
            .rev()
            .map(|i| square(&i.to_string(), i as f64 * 2.0, 0.0))
            .collect();
        let index = EnvelopeIndex::build(&features);
        assert_eq!(index.len(), 50);

        let hits = index.candidates(&Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 5.0, y: 1.0 }));
        // Carrés en x = 0, 2, 4 : positions 49, 48, 47
        assert_eq!(hits, vec![47, 48, 49]);
    }

    #[test]
    fn test_edge_contact_is_candidate() {
        let features = vec![square("a", 1.0, 0.0)];
        let index = EnvelopeIndex::build(&features);
        let hits = index.candidates(&Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn test_empty() {
        let index = EnvelopeIndex::build::<ExternalFeature>(&[]);
        assert!(index.is_empty());
        assert!(index
            .candidates(&Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }))
            .is_empty());
    }
}
