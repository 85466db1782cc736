use super::BoundingBox;

/// Intersection area of two boxes, `None` when they are strictly apart on an axis.
///
/// Boxes sharing only an edge overlap with area `0.0`.
pub fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> Option<f64> {
    let dx = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
    let dy = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);

    if dx >= 0.0 && dy >= 0.0 {
        return Some(dx * dy);
    }
    None
}

pub fn overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    overlap_area(a, b).is_some()
}

pub fn center(bbox: &BoundingBox) -> (f64, f64) {
    (bbox.x + bbox.w / 2.0, bbox.y + bbox.h / 2.0)
}

pub fn squared_center_distance(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let (ax, ay) = center(a);
    let (bx, by) = center(b);
    (ax - bx).powi(2) + (ay - by).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: f64, y: f64, w: f64, h: f64) -> BoundingBox {
        BoundingBox::new(x, y, w, h)
    }

    #[test]
    fn test_partial_overlap() {
        assert_eq!(overlap_area(&bb(0.0, 0.0, 10.0, 10.0), &bb(5.0, 5.0, 10.0, 10.0)), Some(25.0));
    }

    #[test]
    fn test_contained_box() {
        assert_eq!(overlap_area(&bb(0.0, 0.0, 100.0, 100.0), &bb(10.0, 20.0, 30.0, 5.0)), Some(150.0));
    }

    #[test]
    fn test_touching_edges_overlap_with_zero_area() {
        assert_eq!(overlap_area(&bb(0.0, 0.0, 10.0, 10.0), &bb(10.0, 0.0, 10.0, 10.0)), Some(0.0));
        assert_eq!(overlap_area(&bb(0.0, 0.0, 10.0, 10.0), &bb(10.0, 10.0, 5.0, 5.0)), Some(0.0));
    }

    #[test]
    fn test_separated_boxes() {
        assert_eq!(overlap_area(&bb(0.0, 0.0, 10.0, 10.0), &bb(10.5, 0.0, 10.0, 10.0)), None);
        assert_eq!(overlap_area(&bb(0.0, 0.0, 10.0, 10.0), &bb(0.0, -20.0, 10.0, 10.0)), None);
        assert!(!overlaps(&bb(0.0, 0.0, 1.0, 1.0), &bb(2.0, 2.0, 1.0, 1.0)));
    }

    #[test]
    fn test_zero_area_boxes() {
        assert_eq!(overlap_area(&bb(5.0, 5.0, 0.0, 0.0), &bb(0.0, 0.0, 10.0, 10.0)), Some(0.0));
        assert_eq!(overlap_area(&bb(5.0, 5.0, 0.0, 0.0), &bb(5.0, 5.0, 0.0, 0.0)), Some(0.0));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = bb(3.0, 1.0, 7.0, 4.0);
        let b = bb(8.0, -2.0, 6.0, 5.0);
        assert_eq!(overlap_area(&a, &b), overlap_area(&b, &a));
    }

    #[test]
    fn test_center() {
        assert_eq!(center(&bb(10.0, 20.0, 4.0, 6.0)), (12.0, 23.0));
        assert_eq!(squared_center_distance(&bb(0.0, 0.0, 2.0, 2.0), &bb(3.0, 4.0, 2.0, 2.0)), 25.0);
    }
}
