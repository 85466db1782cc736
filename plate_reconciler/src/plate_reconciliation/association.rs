use super::geometry::{overlaps, squared_center_distance};
use super::{PlateRecord, VehicleRecord};

/// Attaches each plate to the closest vehicle that has no plate yet.
///
/// Plates are taken in the given order and never reassigned, so an early plate
/// can claim a vehicle a later plate would have matched better. A plate whose
/// closest free vehicle does not overlap it stays unassigned.
/// Returns the number of unassigned plates.
pub fn associate(cars: &mut [VehicleRecord], plates: Vec<PlateRecord>) -> usize {
    let mut claimed = vec![false; cars.len()];
    let mut unassigned = 0;

    for plate in plates {
        let mut closest: Option<(usize, f64)> = None;

        for (ic, car) in cars.iter().enumerate() {
            if claimed[ic] {
                continue;
            }
            let dist = squared_center_distance(&car.bounding_box, &plate.bounding_box);
            if closest.map_or(true, |(_, min_dist)| dist < min_dist) {
                closest = Some((ic, dist));
            }
        }

        match closest {
            Some((ic, _)) if overlaps(&plate.bounding_box, &cars[ic].bounding_box) => {
                cars[ic].plates = vec![plate];
                claimed[ic] = true;
            }
            _ => unassigned += 1,
        }
    }

    unassigned
}

#[cfg(test)]
mod tests {
    use super::super::{BoundingBox, VehicleCategory};
    use super::*;

    fn car(x: f64, y: f64) -> VehicleRecord {
        VehicleRecord::new(BoundingBox::new(x, y, 100.0, 80.0), VehicleCategory::Car)
    }

    fn plate(text: &str, x: f64, y: f64) -> PlateRecord {
        PlateRecord {
            bounding_box: BoundingBox::new(x, y, 30.0, 8.0),
            plate_text: Some(text.to_string()),
            valid_plate: true,
        }
    }

    #[test]
    fn test_plate_goes_to_closest_car() {
        let mut cars = vec![car(0.0, 0.0), car(90.0, 0.0)];
        let unassigned = associate(&mut cars, vec![plate("AA123BB", 120.0, 40.0)]);

        assert_eq!(unassigned, 0);
        assert!(cars[0].plates.is_empty());
        assert_eq!(cars[1].plates[0].plate_text.as_deref(), Some("AA123BB"));
    }

    #[test]
    fn test_plate_outside_closest_car_is_dropped() {
        let mut cars = vec![car(0.0, 0.0)];
        let unassigned = associate(&mut cars, vec![plate("AA123BB", 300.0, 300.0)]);

        assert_eq!(unassigned, 1);
        assert!(cars[0].plates.is_empty());
    }

    #[test]
    fn test_one_plate_per_car() {
        let mut cars = vec![car(0.0, 0.0)];
        let unassigned = associate(
            &mut cars,
            vec![plate("AA123BB", 30.0, 40.0), plate("CC456DD", 35.0, 40.0)],
        );

        assert_eq!(unassigned, 1);
        assert_eq!(cars[0].plates.len(), 1);
        assert_eq!(cars[0].plates[0].plate_text.as_deref(), Some("AA123BB"));
    }

    #[test]
    fn test_greedy_order_is_kept() {
        // The first plate sits between both cars but slightly closer to the
        // second, which the second plate would have matched perfectly.
        let mut cars = vec![car(0.0, 0.0), car(100.0, 0.0)];
        let first = plate("AA123BB", 86.0, 36.0);
        let second = plate("CC456DD", 135.0, 36.0);

        let unassigned = associate(&mut cars, vec![first, second]);

        assert_eq!(cars[1].plates[0].plate_text.as_deref(), Some("AA123BB"));
        assert!(cars[0].plates.is_empty());
        assert_eq!(unassigned, 1);
    }

    #[test]
    fn test_no_cars() {
        let mut cars: Vec<VehicleRecord> = vec![];
        assert_eq!(associate(&mut cars, vec![plate("AA123BB", 0.0, 0.0)]), 1);
    }

    #[test]
    fn test_never_assigns_non_overlapping_plate() {
        let mut cars = vec![car(0.0, 0.0), car(500.0, 0.0), car(0.0, 500.0)];
        let plates = vec![
            plate("AA123BB", 10.0, 10.0),
            plate("CC456DD", 250.0, 250.0),
            plate("EE789FF", 520.0, 30.0),
        ];
        associate(&mut cars, plates);

        for c in &cars {
            assert!(c.plates.len() <= 1);
            for p in &c.plates {
                assert!(overlaps(&p.bounding_box, &c.bounding_box));
            }
        }
    }
}
