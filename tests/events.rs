use neutron_convert::array::{Bins, Dimensions, Values, units};
use neutron_convert::{DataArray, Dataset, Dim, Measurement, Variable, convert};

const EVENT_TOF: [f64; 4] = [5200.0, 7300.0, 6100.0, 6900.0];

fn with_geometry(array: DataArray) -> DataArray {
    array
        .with_coord(
            Dim::POSITION,
            Variable::vectors(Dim::SPECTRUM, units::M, vec![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]]),
        )
        .unwrap()
        .with_coord(Dim::SOURCE_POSITION, Variable::vector([0.0, 0.0, -10.0], units::M))
        .unwrap()
        .with_coord(Dim::SAMPLE_POSITION, Variable::vector([0.0, 0.0, 0.0], units::M))
        .unwrap()
}

/// Two events per spectrum, stored in one flat buffer.
fn binned() -> DataArray {
    let buffer = DataArray::new("events", Variable::array(Dim::EVENT, units::COUNTS, vec![1.0; 4]))
        .with_coord(Dim::TOF, Variable::array(Dim::EVENT, units::US, EVENT_TOF.to_vec()))
        .unwrap();
    let bins = Bins::from_sizes(&[2, 2], Dim::EVENT, buffer).unwrap();
    let data = Variable::binned(Dimensions::one(Dim::SPECTRUM, 2), bins).unwrap();
    with_geometry(DataArray::new("events", data))
}

/// The same flight times as a dense spectrum-by-tof coordinate.
fn dense() -> DataArray {
    let dims = Dimensions::new(vec![Dim::SPECTRUM, Dim::TOF], vec![2, 2]).unwrap();
    let counts = Variable::new(dims.clone(), units::COUNTS, Values::F64(vec![1.0; 4])).unwrap();
    let tof = Variable::new(dims, units::US, Values::F64(EVENT_TOF.to_vec())).unwrap();
    with_geometry(DataArray::new("dense", counts).with_coord(Dim::TOF, tof).unwrap())
}

fn event_coord(data: &DataArray, dim: &Dim) -> Variable {
    data.data()
        .bins()
        .unwrap()
        .buffer()
        .coords()
        .require(dim)
        .unwrap()
        .clone()
}

fn assert_events_match_dense(events: &DataArray, dense: &DataArray, axis: &Dim) {
    let from_events = event_coord(events, axis);
    let from_dense = dense.coords().require(axis).unwrap();
    assert_eq!(from_events.unit(), from_dense.unit(), "{axis}");
    assert_eq!(
        from_events.f64_values().unwrap().to_vec(),
        from_dense.f64_values().unwrap().to_vec(),
        "{axis}"
    );
}

#[test]
fn events_and_dense_agree_exactly() {
    for axis in [Dim::DSPACING, Dim::WAVELENGTH, Dim::ENERGY] {
        let events = convert(binned(), &Dim::TOF, &axis).unwrap();
        let dense = convert(dense(), &Dim::TOF, &axis).unwrap();
        assert_events_match_dense(&events, &dense, &axis);
    }
}

#[test]
fn inelastic_events_and_dense_agree_exactly() {
    let incident = Variable::scalar(25.0, units::MEV);
    let events = binned()
        .with_coord(Dim::INCIDENT_ENERGY, incident.clone())
        .unwrap();
    let dense = dense().with_coord(Dim::INCIDENT_ENERGY, incident).unwrap();
    let events = convert(events, &Dim::TOF, &Dim::ENERGY_TRANSFER).unwrap();
    let dense = convert(dense, &Dim::TOF, &Dim::ENERGY_TRANSFER).unwrap();
    assert_events_match_dense(&events, &dense, &Dim::ENERGY_TRANSFER);
}

#[test]
fn momentum_transfer_events_and_dense_agree_exactly() {
    let to_q = |data: DataArray| {
        let wavelength = convert(data, &Dim::TOF, &Dim::WAVELENGTH).unwrap();
        convert(wavelength, &Dim::WAVELENGTH, &Dim::Q).unwrap()
    };
    assert_events_match_dense(&to_q(binned()), &to_q(dense()), &Dim::Q);
}

#[test]
fn event_coordinate_is_renamed_in_place() {
    let events = convert(binned(), &Dim::TOF, &Dim::WAVELENGTH).unwrap();
    let buffer = events.data().bins().unwrap().buffer();
    assert!(buffer.coords().contains(&Dim::WAVELENGTH));
    assert!(!buffer.coords().contains(&Dim::TOF));
    assert_eq!(events.data().bins().unwrap().ranges(), &[(0, 2), (2, 4)]);
    // Event weights are untouched.
    assert_eq!(buffer.data().f64_values().unwrap().to_vec(), vec![1.0; 4]);
}

#[test]
fn events_round_trip_through_dspacing() {
    let there = convert(binned(), &Dim::TOF, &Dim::DSPACING).unwrap();
    assert!(there.attrs().contains(&Dim::POSITION));
    let back = convert(there, &Dim::DSPACING, &Dim::TOF).unwrap();
    let tof = event_coord(&back, &Dim::TOF);
    assert_eq!(tof.unit(), units::US);
    for (a, e) in tof.f64_values().unwrap().iter().zip(EVENT_TOF) {
        assert!((a - e).abs() < 1e-9 * e, "{a} vs {e}");
    }
}

#[test]
fn binned_edges_and_events_convert_together() {
    let mut dataset = Dataset::from(binned());
    dataset
        .set_item(
            "histogram",
            Variable::new(
                Dimensions::new(vec![Dim::SPECTRUM, Dim::TOF], vec![2, 1]).unwrap(),
                units::COUNTS,
                Values::F64(vec![2.0, 2.0]),
            )
            .unwrap(),
        )
        .unwrap();
    dataset
        .set_coord(Dim::TOF, Variable::array(Dim::TOF, units::US, vec![5000.0, 8000.0]))
        .unwrap();
    let converted = convert(dataset, &Dim::TOF, &Dim::WAVELENGTH).unwrap();
    let edges = converted.coords().require(&Dim::WAVELENGTH).unwrap();
    assert_eq!(edges.dims().shape(), vec![2, 2]);
    let events = converted.item("events").unwrap().data().bins().unwrap();
    assert!(events.buffer().coords().contains(&Dim::WAVELENGTH));
    assert!(converted.item("histogram").unwrap().dims().contains(&Dim::WAVELENGTH));
}
