//! Moving `position` between shared coordinates and per-item attributes.
//!
//! Detector positions stop being aligned with the data once it is expressed in a
//! position-invariant quantity (d-spacing, Q) or, for non-scattering data, once the flight
//! time has been folded away. They are then demoted to attributes; the reverse conversion
//! promotes them back. A move is staged first and committed only after every item has been
//! validated, so a failed promotion leaves the container untouched.

use neutron_array::{Dim, Measurement, Variable};
use neutron_beamline::ConvertMode;

use crate::error::ConvertError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Coordinate becomes an attribute of every item.
    Demote,
    /// Identical attributes of every item merge into one coordinate.
    Promote,
}

/// A validated move, ready to be applied.
#[derive(Debug)]
pub struct StagedMove {
    field: Dim,
    direction: Direction,
    value: Variable,
}

impl StagedMove {
    /// Validate moving `field`; `None` when there is nothing to move.
    pub fn prepare<T: Measurement>(
        data: &T,
        field: &Dim,
        direction: Direction,
    ) -> Result<Option<Self>, ConvertError> {
        let mut items = data.items().peekable();
        if items.peek().is_none() {
            return Ok(None);
        }
        let value = match direction {
            Direction::Demote => match data.coords().get(field) {
                Some(coord) => coord.clone(),
                None => return Ok(None),
            },
            Direction::Promote => {
                let mut reference: Option<&Variable> = None;
                for (name, item) in items {
                    let attr = item.attrs().get(field);
                    match (reference, attr) {
                        (None, None) => return Ok(None),
                        (None, Some(attr)) => reference = Some(attr),
                        (Some(expected), Some(attr)) if expected == attr => {}
                        (Some(_), _) => {
                            return Err(ConvertError::PositionConsistencyViolation {
                                field: field.clone(),
                                item: name.to_string(),
                            });
                        }
                    }
                }
                match reference {
                    Some(value) => value.clone(),
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(Self {
            field: field.clone(),
            direction,
            value,
        }))
    }

    pub fn commit<T: Measurement>(self, mut data: T) -> T {
        tracing::debug!(field = %self.field, direction = ?self.direction, "relocating metadata");
        match self.direction {
            Direction::Demote => {
                data.coords_mut().remove(&self.field);
                for (_, item) in data.items_mut() {
                    item.attrs_mut().insert(self.field.clone(), self.value.clone());
                }
            }
            Direction::Promote => {
                for (_, item) in data.items_mut() {
                    item.attrs_mut().remove(&self.field);
                }
                data.coords_mut().insert(self.field, self.value);
            }
        }
        data
    }
}

fn relocate<T: Measurement>(data: T, field: &Dim, direction: Direction) -> Result<T, ConvertError> {
    match StagedMove::prepare(&data, field, direction)? {
        Some(staged) => Ok(staged.commit(data)),
        None => Ok(data),
    }
}

fn position_invariant(dim: &Dim) -> bool {
    *dim == Dim::DSPACING || *dim == Dim::Q
}

/// Restore `position` as a coordinate if the conversion `from -> to` needs it.
pub fn attrs_to_coords<T: Measurement>(
    data: T,
    from: &Dim,
    to: &Dim,
    mode: ConvertMode,
) -> Result<T, ConvertError> {
    let needed = match mode {
        ConvertMode::Scatter => position_invariant(from),
        ConvertMode::NoScatter => *to == Dim::TOF,
    };
    if needed {
        return relocate(data, &Dim::POSITION, Direction::Promote);
    }
    Ok(data)
}

/// Demote `position` to attributes once the result no longer depends on it per element.
pub fn coords_to_attrs<T: Measurement>(
    data: T,
    from: &Dim,
    to: &Dim,
    mode: ConvertMode,
) -> Result<T, ConvertError> {
    let stale = match mode {
        ConvertMode::Scatter => position_invariant(to),
        ConvertMode::NoScatter => *from == Dim::TOF,
    };
    if stale {
        return relocate(data, &Dim::POSITION, Direction::Demote);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use neutron_array::{Dataset, units};

    use super::*;

    fn dataset() -> Dataset {
        let counts = Variable::array(Dim::SPECTRUM, units::COUNTS, vec![1.0, 2.0]);
        Dataset::new()
            .with_item("a", counts.clone())
            .unwrap()
            .with_item("b", counts)
            .unwrap()
            .with_coord(
                Dim::POSITION,
                Variable::vectors(Dim::SPECTRUM, units::M, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]),
            )
            .unwrap()
    }

    #[test]
    fn demote_then_promote_restores_coordinate() {
        let original = dataset();
        let demoted = relocate(original.clone(), &Dim::POSITION, Direction::Demote).unwrap();
        assert!(!demoted.coords().contains(&Dim::POSITION));
        assert!(demoted.item("a").unwrap().attrs().contains(&Dim::POSITION));
        let promoted = relocate(demoted, &Dim::POSITION, Direction::Promote).unwrap();
        assert_eq!(promoted, original);
    }

    #[test]
    fn inconsistent_attributes_block_promotion() {
        let mut demoted = relocate(dataset(), &Dim::POSITION, Direction::Demote).unwrap();
        demoted
            .set_attr(
                "b",
                Dim::POSITION,
                Variable::vectors(Dim::SPECTRUM, units::M, vec![[0.0, 0.0, 2.0], [0.0, 1.0, 0.0]]),
            )
            .unwrap();
        let err = StagedMove::prepare(&demoted, &Dim::POSITION, Direction::Promote).unwrap_err();
        match err {
            ConvertError::PositionConsistencyViolation { field, item } => {
                assert_eq!(field, Dim::POSITION);
                assert_eq!(item, "b");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nothing_to_move_is_a_no_op() {
        let counts = Variable::array(Dim::SPECTRUM, units::COUNTS, vec![1.0]);
        let plain = Dataset::new().with_item("a", counts).unwrap();
        assert!(
            StagedMove::prepare(&plain, &Dim::POSITION, Direction::Promote)
                .unwrap()
                .is_none()
        );
    }
}
