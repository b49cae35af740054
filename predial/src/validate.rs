//! Contrôle de validité des géométries soumises
//!
//! Seuls Polygon et MultiPolygon sont admis. Le prédicat de validité simple :
//! coordonnées finies, rings d'au moins trois sommets distincts et d'aire non
//! nulle, pas d'auto-intersection, rings d'un même polygone qui ne se croisent
//! pas, trous contenus dans leur enveloppe extérieure et non imbriqués, parties
//! d'un MultiPolygon sans recouvrement. L'orientation n'est pas vérifiée.

use std::fmt;

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{
    Area, BooleanOps, BoundingRect, Contains, Coord, Geometry, Intersects, Line, LineString,
    Point, Polygon,
};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::types::Areal;

/// Référence d'un ring : partie du MultiPolygon, puis ring (0 = extérieur)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingRef {
    pub part: usize,
    pub ring: usize,
}

impl fmt::Display for RingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ring == 0 {
            write!(f, "{}:exterior", self.part)
        } else {
            write!(f, "{}:hole{}", self.part, self.ring)
        }
    }
}

/// Motif de rejet d'une géométrie
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Invalidity {
    #[error("unsupported geometry type {0}")]
    UnsupportedType(&'static str),

    #[error("empty geometry")]
    Empty,

    #[error("non-finite coordinate in ring {0}")]
    NonFinite(RingRef),

    #[error("ring {ring} has too few distinct points ({points})")]
    TooFewPoints { ring: RingRef, points: usize },

    #[error("ring {0} has zero area")]
    ZeroArea(RingRef),

    #[error("ring {ring} self-intersects at ({x}, {y})")]
    SelfIntersection { ring: RingRef, x: f64, y: f64 },

    #[error("rings {a} and {b} cross")]
    RingsCross { a: RingRef, b: RingRef },

    #[error("hole {0} lies outside its shell")]
    HoleOutsideShell(RingRef),

    #[error("hole {inner} is nested inside hole {outer}")]
    NestedHoles { inner: RingRef, outer: RingRef },

    #[error("parts {a} and {b} overlap")]
    OverlappingParts { a: usize, b: usize },

    #[error("parts {a} and {b} share a boundary segment")]
    TouchingParts { a: usize, b: usize },
}

/// Nom GeoJSON d'une géométrie geo
pub fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Vérifie une géométrie et la convertit en [`Areal`] si elle est acceptée
pub fn check(geometry: &Geometry) -> Result<Areal, Invalidity> {
    let areal = match geometry {
        Geometry::Polygon(p) => Areal::Polygon(p.clone()),
        Geometry::MultiPolygon(mp) => Areal::MultiPolygon(mp.clone()),
        other => return Err(Invalidity::UnsupportedType(geometry_kind(other))),
    };
    check_areal(&areal)?;
    Ok(areal)
}

/// Prédicat booléen : déterministe, et toujours vrai sur une géométrie déjà acceptée
pub fn validate(geometry: &Geometry) -> bool {
    check(geometry).is_ok()
}

/// Vérifie une géométrie surfacique
pub fn check_areal(areal: &Areal) -> Result<(), Invalidity> {
    let polygons = areal.polygons();
    if polygons.is_empty() {
        return Err(Invalidity::Empty);
    }

    for (part, polygon) in polygons.iter().enumerate() {
        check_polygon(part, polygon)?;
    }

    check_parts_disjoint(polygons)
}

/// Filtre d'entrée : journalise chaque rejet dans le sink injecté
pub struct GeometryValidator<'s> {
    sink: &'s mut dyn DiagnosticSink,
}

impl<'s> GeometryValidator<'s> {
    pub fn new(sink: &'s mut dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    /// `true` si la géométrie est acceptée ; sinon le rejet est signalé
    pub fn validate(&mut self, index: usize, feature_id: Option<&str>, geometry: &Geometry) -> bool {
        self.accept(index, feature_id, geometry).is_some()
    }

    /// Signale une feature écartée avant tout contrôle (géométrie absente)
    pub fn reject(&mut self, index: usize, feature_id: Option<&str>, reason: &str) {
        self.sink
            .emit(Diagnostic::rejected(index, feature_id, reason));
    }

    /// Variante qui rend la géométrie acceptée
    pub fn accept(
        &mut self,
        index: usize,
        feature_id: Option<&str>,
        geometry: &Geometry,
    ) -> Option<Areal> {
        match check(geometry) {
            Ok(areal) => Some(areal),
            Err(invalidity) => {
                self.sink
                    .emit(Diagnostic::invalid(index, feature_id, &invalidity));
                None
            }
        }
    }
}

fn check_polygon(part: usize, polygon: &Polygon) -> Result<(), Invalidity> {
    let exterior_ref = RingRef { part, ring: 0 };
    let exterior = check_ring(exterior_ref, polygon.exterior())?;

    let mut holes = Vec::with_capacity(polygon.interiors().len());
    for (i, interior) in polygon.interiors().iter().enumerate() {
        let ring_ref = RingRef { part, ring: i + 1 };
        holes.push((ring_ref, check_ring(ring_ref, interior)?));
    }

    if holes.is_empty() {
        return Ok(());
    }

    for (hole_ref, hole_segments) in &holes {
        if rings_cross(&exterior, hole_segments) {
            return Err(Invalidity::RingsCross {
                a: exterior_ref,
                b: *hole_ref,
            });
        }
    }
    for (i, (a_ref, a)) in holes.iter().enumerate() {
        for (b_ref, b) in holes.iter().skip(i + 1) {
            if rings_cross(a, b) {
                return Err(Invalidity::RingsCross {
                    a: *a_ref,
                    b: *b_ref,
                });
            }
        }
    }

    let shell = Polygon::new(polygon.exterior().clone(), vec![]);
    for (i, interior) in polygon.interiors().iter().enumerate() {
        let hole_ref = RingRef { part, ring: i + 1 };
        if !interior.coords().all(|c| shell.intersects(&Point::from(*c))) {
            return Err(Invalidity::HoleOutsideShell(hole_ref));
        }
    }

    let hole_polygons: Vec<Polygon> = polygon
        .interiors()
        .iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();
    for (i, inner) in polygon.interiors().iter().enumerate() {
        for (j, outer) in hole_polygons.iter().enumerate() {
            if i != j && inner.coords().any(|c| outer.contains(&Point::from(*c))) {
                return Err(Invalidity::NestedHoles {
                    inner: RingRef { part, ring: i + 1 },
                    outer: RingRef { part, ring: j + 1 },
                });
            }
        }
    }

    Ok(())
}

/// Vérifie un ring isolé et rend ses segments de longueur non nulle
fn check_ring(ring_ref: RingRef, ring: &LineString) -> Result<Vec<Line>, Invalidity> {
    if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Invalidity::NonFinite(ring_ref));
    }

    // Les points répétés consécutifs sont tolérés
    let segments: Vec<Line> = ring.lines().filter(|l| l.start != l.end).collect();
    if ring.0.len() < 4 || segments.len() < 3 {
        return Err(Invalidity::TooFewPoints {
            ring: ring_ref,
            points: segments.len(),
        });
    }

    let n = segments.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match intersection(segments[i], segments[j]) {
                None => {}
                // Deux segments consécutifs partagent leur extrémité commune
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    return Err(Invalidity::SelfIntersection {
                        ring: ring_ref,
                        x: intersection.x,
                        y: intersection.y,
                    });
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    return Err(Invalidity::SelfIntersection {
                        ring: ring_ref,
                        x: intersection.start.x,
                        y: intersection.start.y,
                    });
                }
            }
        }
    }

    // Après le test d'auto-intersection : un papillon a une aire signée nulle
    if ring_signed_area(ring) == 0.0 {
        return Err(Invalidity::ZeroArea(ring_ref));
    }

    Ok(segments)
}

/// Croisement franc ou recouvrement colinéaire entre deux rings
///
/// Un contact ponctuel (sommet sur sommet ou sur segment) reste admis.
fn rings_cross(a: &[Line], b: &[Line]) -> bool {
    a.iter().any(|sa| {
        b.iter().any(|sb| {
            matches!(
                intersection(*sa, *sb),
                Some(LineIntersection::SinglePoint {
                    is_proper: true,
                    ..
                }) | Some(LineIntersection::Collinear { .. })
            )
        })
    })
}

/// Recouvrement colinéaire entre un ring quelconque de `a` et un de `b`
fn rings_share_segment(a: &Polygon, b: &Polygon) -> bool {
    let segments = |p: &Polygon| -> Vec<Line> {
        std::iter::once(p.exterior())
            .chain(p.interiors())
            .flat_map(|ring| ring.lines())
            .filter(|l| l.start != l.end)
            .collect()
    };
    let (sa, sb) = (segments(a), segments(b));
    sa.iter().any(|la| {
        sb.iter().any(|lb| {
            matches!(
                intersection(*la, *lb),
                Some(LineIntersection::Collinear { .. })
            )
        })
    })
}

/// Intersection de segments, avec rejet rapide par rectangles englobants
fn intersection(a: Line, b: Line) -> Option<LineIntersection<f64>> {
    if !a.bounding_rect().intersects(&b.bounding_rect()) {
        return None;
    }
    line_intersection(a, b)
}

/// Aire signée d'un ring fermé (formule du lacet)
fn ring_signed_area(ring: &LineString) -> f64 {
    ring.lines()
        .map(|Line { start, end }| cross(start, end))
        .sum::<f64>()
        / 2.0
}

fn cross(a: Coord, b: Coord) -> f64 {
    a.x * b.y - b.x * a.y
}

fn check_parts_disjoint(polygons: &[Polygon]) -> Result<(), Invalidity> {
    let rects: Vec<_> = polygons.iter().map(|p| p.bounding_rect()).collect();

    for i in 0..polygons.len() {
        for j in (i + 1)..polygons.len() {
            let (Some(ri), Some(rj)) = (rects[i], rects[j]) else {
                continue;
            };
            if !ri.intersects(&rj) || !polygons[i].intersects(&polygons[j]) {
                continue;
            }
            if polygons[i].intersection(&polygons[j]).unsigned_area() > 0.0 {
                return Err(Invalidity::OverlappingParts { a: i, b: j });
            }
            // Les parties ne peuvent se toucher qu'en des points isolés
            if rings_share_segment(&polygons[i], &polygons[j]) {
                return Err(Invalidity::TouchingParts { a: i, b: j });
            }
        }
    }

    Ok(())
}
