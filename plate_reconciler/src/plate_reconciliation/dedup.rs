use super::geometry::overlaps;
use super::PlateRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlateStatus {
    Pending,
    Kept,
    /// Removed by an earlier plate it collided with.
    Excluded,
    /// Removed because a later valid plate collided with it.
    Dropped,
}

/// Removes colliding plates of a single frame.
///
/// For each remaining plate `i`, every later remaining plate `j` whose box
/// overlaps it is resolved by the first rule that applies:
/// same text excludes `j`; valid `i` excludes invalid `j`; invalid `i` is
/// dropped in favour of valid `j`; otherwise the earlier plate wins.
/// Kept plates are returned in input order.
pub fn dedupe(plates: Vec<PlateRecord>) -> Vec<PlateRecord> {
    let mut status = vec![PlateStatus::Pending; plates.len()];

    for i in 0..plates.len() {
        if status[i] == PlateStatus::Excluded {
            continue;
        }
        let p1 = &plates[i];
        status[i] = PlateStatus::Kept;

        for j in i + 1..plates.len() {
            if status[j] == PlateStatus::Excluded {
                continue;
            }
            let p2 = &plates[j];

            if !overlaps(&p1.bounding_box, &p2.bounding_box) {
                continue;
            }

            if p1.plate_text == p2.plate_text {
                status[j] = PlateStatus::Excluded;
            } else if p1.valid_plate && !p2.valid_plate {
                status[j] = PlateStatus::Excluded;
            } else if !p1.valid_plate && p2.valid_plate {
                status[i] = PlateStatus::Dropped;
                break;
            } else {
                status[j] = PlateStatus::Excluded;
            }
        }
    }

    plates
        .into_iter()
        .zip(status)
        .filter(|(_, s)| *s == PlateStatus::Kept)
        .map(|(p, _)| p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::BoundingBox;
    use super::*;

    fn plate(text: &str, valid: bool, x: f64) -> PlateRecord {
        PlateRecord {
            bounding_box: BoundingBox::new(x, 0.0, 40.0, 10.0),
            plate_text: Some(text.to_string()),
            valid_plate: valid,
        }
    }

    fn texts(plates: &[PlateRecord]) -> Vec<&str> {
        plates.iter().map(|p| p.plate_text.as_deref().unwrap_or("")).collect()
    }

    #[test]
    fn test_same_text_keeps_earliest() {
        let out = dedupe(vec![plate("AA123BB", true, 0.0), plate("AA123BB", true, 5.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box.x, 0.0);
    }

    #[test]
    fn test_disjoint_plates_are_all_kept() {
        let out = dedupe(vec![plate("AA123BB", true, 0.0), plate("AA123BB", true, 100.0)]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_valid_beats_later_invalid() {
        let out = dedupe(vec![plate("AA123BB", true, 0.0), plate("AA12", false, 10.0)]);
        assert_eq!(texts(&out), vec!["AA123BB"]);
    }

    #[test]
    fn test_later_valid_beats_earlier_invalid() {
        let out = dedupe(vec![plate("AA12", false, 0.0), plate("AA123BB", true, 10.0)]);
        assert_eq!(texts(&out), vec!["AA123BB"]);
    }

    #[test]
    fn test_same_validity_keeps_earliest() {
        let out = dedupe(vec![plate("AA123BB", true, 0.0), plate("CC456DD", true, 10.0)]);
        assert_eq!(texts(&out), vec!["AA123BB"]);

        let out = dedupe(vec![plate("XX", false, 0.0), plate("YY", false, 10.0)]);
        assert_eq!(texts(&out), vec!["XX"]);
    }

    #[test]
    fn test_dropped_plate_keeps_earlier_exclusions() {
        // The first plate excludes the second, then loses to the third.
        let out = dedupe(vec![
            plate("XX", false, 0.0),
            plate("YY", false, 5.0),
            plate("AA123BB", true, 10.0),
        ]);
        assert_eq!(texts(&out), vec!["AA123BB"]);
    }

    #[test]
    fn test_touching_plates_collide() {
        let out = dedupe(vec![plate("AA123BB", true, 0.0), plate("CC456DD", true, 40.0)]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let out = dedupe(vec![
            plate("CC456DD", true, 300.0),
            plate("AA123BB", true, 0.0),
            plate("EE789FF", true, 150.0),
        ]);
        assert_eq!(texts(&out), vec!["CC456DD", "AA123BB", "EE789FF"]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            plate("XX", false, 0.0),
            plate("AA123BB", true, 20.0),
            plate("AA123BB", true, 25.0),
            plate("CC456DD", true, 55.0),
            plate("ZZ", false, 200.0),
            plate("EE789FF", true, 230.0),
            plate("GG", false, 400.0),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty() {
        assert!(dedupe(vec![]).is_empty());
    }
}
